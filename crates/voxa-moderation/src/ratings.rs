// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rating-label → minimum-age tables.
//!
//! Unknown labels contribute no age floor.

/// MPAA movie rating → minimum age.
pub fn movie_rating_age(label: &str) -> Option<u8> {
    match label {
        "G" => Some(2),
        "PG" => Some(8),
        "PG-13" => Some(13),
        "R" | "NC-17" => Some(17),
        _ => None,
    }
}

/// US TV rating → minimum age.
pub fn tv_rating_age(label: &str) -> Option<u8> {
    match label {
        "TV-Y" | "TV-G" => Some(2),
        "TV-Y7" | "TV-Y7-FV" => Some(7),
        "TV-PG" => Some(10),
        "TV-14" => Some(14),
        "TV-MA" => Some(17),
        _ => None,
    }
}

/// ESRB rating → minimum age.
pub fn esrb_rating_age(label: &str) -> Option<u8> {
    match label {
        "E" | "EC" => Some(3),
        "E10+" => Some(10),
        "T" => Some(13),
        "M" => Some(17),
        "AO" => Some(18),
        _ => None,
    }
}

/// PEGI labels are the age itself (`3`, `7`, `12`, `16`, `18`).
pub fn pegi_rating_age(label: &str) -> Option<u8> {
    label.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_table_floors_ages() {
        assert_eq!(movie_rating_age("G"), Some(2));
        assert_eq!(movie_rating_age("PG"), Some(8));
        assert_eq!(movie_rating_age("PG-13"), Some(13));
        assert_eq!(movie_rating_age("R"), Some(17));
        assert_eq!(movie_rating_age("NC-17"), Some(17));
        assert_eq!(movie_rating_age("X"), None);
    }

    #[test]
    fn tv_table_floors_ages() {
        assert_eq!(tv_rating_age("TV-Y"), Some(2));
        assert_eq!(tv_rating_age("TV-G"), Some(2));
        assert_eq!(tv_rating_age("TV-Y7"), Some(7));
        assert_eq!(tv_rating_age("TV-Y7-FV"), Some(7));
        assert_eq!(tv_rating_age("TV-PG"), Some(10));
        assert_eq!(tv_rating_age("TV-14"), Some(14));
        assert_eq!(tv_rating_age("TV-MA"), Some(17));
    }

    #[test]
    fn esrb_table_floors_ages() {
        assert_eq!(esrb_rating_age("EC"), Some(3));
        assert_eq!(esrb_rating_age("E"), Some(3));
        assert_eq!(esrb_rating_age("E10+"), Some(10));
        assert_eq!(esrb_rating_age("T"), Some(13));
        assert_eq!(esrb_rating_age("M"), Some(17));
        assert_eq!(esrb_rating_age("AO"), Some(18));
    }

    #[test]
    fn pegi_parses_numeric_labels() {
        assert_eq!(pegi_rating_age("3"), Some(3));
        assert_eq!(pegi_rating_age("18"), Some(18));
        assert_eq!(pegi_rating_age("PEGI"), None);
        assert_eq!(pegi_rating_age(""), None);
    }
}
