use crate::models::tour::Tour;
use crate::services::validation::ValidationError;

pub struct PricingService;

impl PricingService {
    /// Booking total: unit price times headcount, for a headcount of at least one.
    pub fn booking_total(unit_price: f64, number_of_people: u32) -> Result<f64, ValidationError> {
        if number_of_people < 1 {
            return Err(ValidationError::OutOfRange(
                "number_of_people",
                "must be at least 1".to_string(),
            ));
        }
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(ValidationError::OutOfRange("price", "is invalid".to_string()));
        }
        Ok(unit_price * f64::from(number_of_people))
    }

    /// Price a booking against the stored tour, checking it is bookable and has room.
    pub fn quote(tour: &Tour, number_of_people: u32) -> Result<f64, ValidationError> {
        if !tour.available {
            return Err(ValidationError::OutOfRange(
                "tour",
                "is not available for booking".to_string(),
            ));
        }
        if number_of_people > tour.max_capacity {
            return Err(ValidationError::OutOfRange(
                "number_of_people",
                format!("exceeds the tour capacity of {}", tour.max_capacity),
            ));
        }
        Self::booking_total(tour.price, number_of_people)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tour::TourType;

    fn tour(price: f64, max_capacity: u32, available: bool) -> Tour {
        Tour {
            id: None,
            title: "Mekong Delta Day Trip".to_string(),
            description: None,
            price,
            duration: "1 day".to_string(),
            location: "Can Tho".to_string(),
            tour_type: TourType::Regular,
            image_url: None,
            max_capacity,
            available,
            rating: 4.5,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_booking_total_calculation() {
        assert_eq!(PricingService::booking_total(50.0, 1), Ok(50.0));
        assert_eq!(PricingService::booking_total(49.5, 4), Ok(198.0));
        assert!(PricingService::booking_total(50.0, 0).is_err());
        assert!(PricingService::booking_total(f64::NAN, 2).is_err());
    }

    #[test]
    fn test_quote_respects_capacity_and_availability() {
        assert_eq!(PricingService::quote(&tour(80.0, 10, true), 3), Ok(240.0));
        assert!(PricingService::quote(&tour(80.0, 2, true), 3).is_err());
        assert!(PricingService::quote(&tour(80.0, 10, false), 1).is_err());
    }
}
