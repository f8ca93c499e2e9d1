use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::models::booking::{BookingInput, HeadcountInput};
use crate::models::contact::ContactInput;
use crate::models::tour::TourInput;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Required(&'static str),
    InvalidNumber(&'static str),
    OutOfRange(&'static str, String),
    InvalidEmail(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required(field) => write!(f, "{} is required", field),
            ValidationError::InvalidNumber(field) => write!(f, "{} must be a number", field),
            ValidationError::OutOfRange(field, reason) => write!(f, "{} {}", field, reason),
            ValidationError::InvalidEmail(email) => write!(f, "Invalid email address: {}", email),
        }
    }
}

impl std::error::Error for ValidationError {}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)+$",
        )
        .expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

pub fn require_email(email: &str) -> Result<(), ValidationError> {
    require_non_empty("email", email)?;
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Parses a headcount typed into the booking form. Non-numeric, zero and
/// negative values are rejected.
pub fn parse_headcount(input: &HeadcountInput) -> Result<u32, ValidationError> {
    let value = match input {
        HeadcountInput::Number(n) => *n,
        HeadcountInput::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ValidationError::Required("number_of_people"));
            }
            text.parse::<i64>()
                .map_err(|_| ValidationError::InvalidNumber("number_of_people"))?
        }
    };

    if value < 1 {
        return Err(ValidationError::OutOfRange(
            "number_of_people",
            "must be at least 1".to_string(),
        ));
    }

    u32::try_from(value).map_err(|_| {
        ValidationError::OutOfRange("number_of_people", "is too large".to_string())
    })
}

pub fn validate_tour_input(input: &TourInput) -> Result<(), ValidationError> {
    require_non_empty("title", &input.title)?;
    require_non_empty("location", &input.location)?;
    require_non_empty("duration", &input.duration)?;

    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(ValidationError::OutOfRange("price", "must be greater than 0".to_string()));
    }
    if input.max_capacity < 1 {
        return Err(ValidationError::OutOfRange(
            "max_capacity",
            "must be at least 1".to_string(),
        ));
    }
    if let Some(rating) = input.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(ValidationError::OutOfRange(
                "rating",
                "must be between 0 and 5".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date < today {
        Err(ValidationError::OutOfRange(
            "booking_date",
            "cannot be in the past".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Checks a booking form and returns the parsed headcount.
pub fn validate_booking_input(input: &BookingInput, today: NaiveDate) -> Result<u32, ValidationError> {
    let number_of_people = parse_headcount(&input.number_of_people)?;
    validate_booking_date(input.booking_date, today)?;
    if let Some(email) = input.contact_email.as_deref().map(str::trim) {
        if !email.is_empty() {
            require_email(email)?;
        }
    }
    Ok(number_of_people)
}

pub fn validate_contact_input(input: &ContactInput) -> Result<(), ValidationError> {
    require_non_empty("full_name", &input.full_name)?;
    require_email(&input.email)?;
    require_non_empty("subject", &input.subject)?;
    require_non_empty("message", &input.message)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tour::TourType;

    fn tour_input() -> TourInput {
        TourInput {
            title: "Ha Long Bay Cruise".to_string(),
            description: None,
            price: 120.0,
            duration: "2 days".to_string(),
            location: "Quang Ninh".to_string(),
            tour_type: TourType::Regular,
            image_url: None,
            max_capacity: 20,
            available: None,
            rating: None,
        }
    }

    #[test]
    fn test_headcount_parsing() {
        assert_eq!(parse_headcount(&HeadcountInput::Number(3)), Ok(3));
        assert_eq!(parse_headcount(&HeadcountInput::Text(" 4 ".to_string())), Ok(4));
        assert_eq!(
            parse_headcount(&HeadcountInput::Text("abc".to_string())),
            Err(ValidationError::InvalidNumber("number_of_people"))
        );
        assert!(parse_headcount(&HeadcountInput::Text("0".to_string())).is_err());
        assert!(parse_headcount(&HeadcountInput::Number(0)).is_err());
        assert!(parse_headcount(&HeadcountInput::Number(-2)).is_err());
        assert_eq!(
            parse_headcount(&HeadcountInput::Text(String::new())),
            Err(ValidationError::Required("number_of_people"))
        );
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("traveler@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("traveler@"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("traveler@localhost"));
        assert!(require_email("").is_err());
    }

    #[test]
    fn test_tour_input_rules() {
        assert!(validate_tour_input(&tour_input()).is_ok());

        let mut input = tour_input();
        input.price = 0.0;
        assert!(validate_tour_input(&input).is_err());

        let mut input = tour_input();
        input.title = "   ".to_string();
        assert_eq!(validate_tour_input(&input), Err(ValidationError::Required("title")));

        let mut input = tour_input();
        input.max_capacity = 0;
        assert!(validate_tour_input(&input).is_err());

        let mut input = tour_input();
        input.rating = Some(7.5);
        assert!(validate_tour_input(&input).is_err());
    }

    #[test]
    fn test_booking_date_not_in_past() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(validate_booking_date(today, today).is_ok());
        assert!(validate_booking_date(today.succ_opt().unwrap(), today).is_ok());
        assert!(validate_booking_date(today.pred_opt().unwrap(), today).is_err());
    }

    #[test]
    fn test_booking_input_returns_headcount() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let input = BookingInput {
            tour_id: "652f1c2ab1e3f4a5b6c7d8e9".to_string(),
            booking_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            number_of_people: HeadcountInput::Text("2".to_string()),
            special_requests: None,
            contact_phone: None,
            contact_email: Some("  ".to_string()),
        };
        assert_eq!(validate_booking_input(&input, today), Ok(2));

        let input = BookingInput {
            contact_email: Some("nope".to_string()),
            ..input
        };
        assert_eq!(
            validate_booking_input(&input, today),
            Err(ValidationError::InvalidEmail("nope".to_string()))
        );
    }

    #[test]
    fn test_contact_requires_all_fields() {
        let input = ContactInput {
            full_name: "Mai".to_string(),
            email: "mai@example.com".to_string(),
            subject: "Group discount".to_string(),
            message: "Do you offer discounts for 10 people?".to_string(),
        };
        assert!(validate_contact_input(&input).is_ok());

        let input = ContactInput {
            subject: String::new(),
            ..input
        };
        assert_eq!(validate_contact_input(&input), Err(ValidationError::Required("subject")));
    }
}
