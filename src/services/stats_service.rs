//! Dashboard and report aggregation over rows already pulled from the store.
//!
//! Everything here is pure: callers fetch bookings, tours and profiles, pass
//! them in together with "now", and serialize the returned structs.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::booking::{Booking, BookingStatus, BookingView};
use crate::models::profile::Profile;
use crate::models::tour::{Tour, TourType};

pub const MONTH_WINDOW: usize = 6;
pub const TOP_LOCATION_LIMIT: usize = 5;
pub const RECENT_BOOKING_LIMIT: usize = 5;
pub const LOCATION_PALETTE: [&str; TOP_LOCATION_LIMIT] =
    ["#4F46E5", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6"];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub label: String,
    pub bookings: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCount {
    pub name: String,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDistribution {
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourTypeDistribution {
    pub regular: usize,
    pub combo: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_bookings: usize,
    pub total_revenue: f64,
    pub total_tours: usize,
    pub total_users: usize,
    pub bookings_trend: String,
    pub revenue_trend: String,
    pub monthly: Vec<MonthBucket>,
    pub status_distribution: StatusDistribution,
    pub tour_types: TourTypeDistribution,
    pub top_locations: Vec<LocationCount>,
    pub recent_bookings: Vec<BookingView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourPerformance {
    pub tour_id: String,
    pub title: String,
    pub bookings: usize,
    pub people: u32,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportStats {
    pub completed_only: bool,
    pub total_bookings: usize,
    pub total_revenue: f64,
    pub average_booking_value: f64,
    pub bookings_trend: String,
    pub revenue_trend: String,
    pub monthly: Vec<MonthBucket>,
    pub status_distribution: StatusDistribution,
    pub tour_performance: Vec<TourPerformance>,
}

fn counted(booking: &Booking, completed_only: bool) -> bool {
    !completed_only || booking.status == BookingStatus::Completed
}

pub fn total_bookings(bookings: &[Booking], completed_only: bool) -> usize {
    bookings.iter().filter(|b| counted(b, completed_only)).count()
}

pub fn total_revenue(bookings: &[Booking], completed_only: bool) -> f64 {
    bookings
        .iter()
        .filter(|b| counted(b, completed_only))
        .map(|b| b.total_price)
        .sum()
}

/// Percentage change between two period aggregates, with an explicit sign.
pub fn trend(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return if current > 0.0 {
            "+100%".to_string()
        } else {
            "0%".to_string()
        };
    }

    // Half-way values round up, so -2.5 becomes -2.
    let change = ((current - previous) / previous * 100.0 + 0.5).floor() as i64;
    if change >= 0 {
        format!("+{}%", change)
    } else {
        format!("{}%", change)
    }
}

/// Whole calendar months between `date` and `now`; negative for future dates.
pub fn months_ago(now: DateTime<Utc>, date: DateTime<Utc>) -> i32 {
    (now.year() - date.year()) * 12 + (now.month() as i32 - date.month() as i32)
}

/// Index into the trailing 6-month window; the current month is the last bucket.
pub fn month_bucket(now: DateTime<Utc>, date: DateTime<Utc>) -> Option<usize> {
    let ago = months_ago(now, date);
    if (0..MONTH_WINDOW as i32).contains(&ago) {
        Some(MONTH_WINDOW - 1 - ago as usize)
    } else {
        None
    }
}

fn month_label(now: DateTime<Utc>, bucket: usize) -> String {
    let ago = (MONTH_WINDOW - 1 - bucket) as i32;
    let month0 = (now.month0() as i32 - ago).rem_euclid(12) as usize;
    MONTH_LABELS[month0].to_string()
}

pub fn monthly_series(
    now: DateTime<Utc>,
    bookings: &[Booking],
    completed_only: bool,
) -> Vec<MonthBucket> {
    let mut series: Vec<MonthBucket> = (0..MONTH_WINDOW)
        .map(|bucket| MonthBucket {
            label: month_label(now, bucket),
            bookings: 0,
            revenue: 0.0,
        })
        .collect();

    for booking in bookings.iter().filter(|b| counted(b, completed_only)) {
        if let Some(bucket) = month_bucket(now, booking.created_at) {
            series[bucket].bookings += 1;
            series[bucket].revenue += booking.total_price;
        }
    }

    series
}

pub fn status_distribution(bookings: &[Booking]) -> StatusDistribution {
    let mut dist = StatusDistribution {
        pending: 0,
        confirmed: 0,
        cancelled: 0,
        completed: 0,
    };
    for booking in bookings {
        match booking.status {
            BookingStatus::Pending => dist.pending += 1,
            BookingStatus::Confirmed => dist.confirmed += 1,
            BookingStatus::Cancelled => dist.cancelled += 1,
            BookingStatus::Completed => dist.completed += 1,
        }
    }
    dist
}

pub fn tour_type_distribution(tours: &[Tour]) -> TourTypeDistribution {
    let regular = tours
        .iter()
        .filter(|t| t.tour_type == TourType::Regular)
        .count();
    TourTypeDistribution {
        regular,
        combo: tours.len() - regular,
    }
}

/// Locations ranked by tour count. Ties keep the order in which locations first appear.
pub fn top_locations(tours: &[Tour]) -> Vec<LocationCount> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for tour in tours {
        match counts.iter_mut().find(|(name, _)| *name == tour.location) {
            Some((_, count)) => *count += 1,
            None => counts.push((tour.location.clone(), 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(TOP_LOCATION_LIMIT)
        .enumerate()
        .map(|(rank, (name, count))| LocationCount {
            name,
            count,
            color: LOCATION_PALETTE[rank].to_string(),
        })
        .collect()
}

/// This-month and last-month aggregates used for the trend strings.
fn month_over_month(now: DateTime<Utc>, bookings: &[Booking], completed_only: bool) -> (String, String) {
    let mut current = (0usize, 0.0f64);
    let mut previous = (0usize, 0.0f64);

    for booking in bookings.iter().filter(|b| counted(b, completed_only)) {
        match months_ago(now, booking.created_at) {
            0 => {
                current.0 += 1;
                current.1 += booking.total_price;
            }
            1 => {
                previous.0 += 1;
                previous.1 += booking.total_price;
            }
            _ => {}
        }
    }

    (
        trend(current.0 as f64, previous.0 as f64),
        trend(current.1, previous.1),
    )
}

fn tour_titles(tours: &[Tour]) -> HashMap<String, String> {
    tours
        .iter()
        .filter_map(|t| t.id.map(|id| (id.to_hex(), t.title.clone())))
        .collect()
}

pub fn build_dashboard(
    now: DateTime<Utc>,
    bookings: &[Booking],
    tours: &[Tour],
    profiles: &[Profile],
) -> DashboardStats {
    let (bookings_trend, revenue_trend) = month_over_month(now, bookings, false);
    let titles = tour_titles(tours);

    let mut recent: Vec<&Booking> = bookings.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent_bookings = recent
        .into_iter()
        .take(RECENT_BOOKING_LIMIT)
        .map(|b| BookingView::new(b.clone(), titles.get(&b.tour_id.to_hex()).cloned()))
        .collect();

    DashboardStats {
        total_bookings: total_bookings(bookings, false),
        total_revenue: total_revenue(bookings, false),
        total_tours: tours.len(),
        total_users: profiles.len(),
        bookings_trend,
        revenue_trend,
        monthly: monthly_series(now, bookings, false),
        status_distribution: status_distribution(bookings),
        tour_types: tour_type_distribution(tours),
        top_locations: top_locations(tours),
        recent_bookings,
    }
}

pub fn tour_performance(bookings: &[Booking], tours: &[Tour], completed_only: bool) -> Vec<TourPerformance> {
    let titles = tour_titles(tours);
    let mut rows: Vec<TourPerformance> = Vec::new();

    for booking in bookings.iter().filter(|b| counted(b, completed_only)) {
        let tour_id = booking.tour_id.to_hex();
        match rows.iter_mut().find(|row| row.tour_id == tour_id) {
            Some(row) => {
                row.bookings += 1;
                row.people += booking.number_of_people;
                row.revenue += booking.total_price;
            }
            None => rows.push(TourPerformance {
                title: titles
                    .get(&tour_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown tour".to_string()),
                tour_id,
                bookings: 1,
                people: booking.number_of_people,
                revenue: booking.total_price,
            }),
        }
    }

    rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    rows
}

pub fn build_report(
    now: DateTime<Utc>,
    bookings: &[Booking],
    tours: &[Tour],
    completed_only: bool,
) -> ReportStats {
    let count = total_bookings(bookings, completed_only);
    let revenue = total_revenue(bookings, completed_only);
    let (bookings_trend, revenue_trend) = month_over_month(now, bookings, completed_only);

    ReportStats {
        completed_only,
        total_bookings: count,
        total_revenue: revenue,
        average_booking_value: if count == 0 { 0.0 } else { revenue / count as f64 },
        bookings_trend,
        revenue_trend,
        monthly: monthly_series(now, bookings, completed_only),
        status_distribution: status_distribution(bookings),
        tour_performance: tour_performance(bookings, tours, completed_only),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use mongodb::bson::oid::ObjectId;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn booking(total_price: f64, status: BookingStatus, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id: Some(ObjectId::new()),
            user_id: ObjectId::new(),
            tour_id: ObjectId::new(),
            booking_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            number_of_people: 2,
            total_price,
            status,
            special_requests: None,
            contact_phone: None,
            contact_email: None,
            created_at,
            updated_at: None,
        }
    }

    fn tour_at(location: &str, tour_type: TourType) -> Tour {
        Tour {
            id: Some(ObjectId::new()),
            title: format!("{} tour", location),
            description: None,
            price: 100.0,
            duration: "1 day".to_string(),
            location: location.to_string(),
            tour_type,
            image_url: None,
            max_capacity: 10,
            available: true,
            rating: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_trend_formatting() {
        assert_eq!(trend(0.0, 0.0), "0%");
        assert_eq!(trend(5.0, 0.0), "+100%");
        assert_eq!(trend(10.0, 5.0), "+100%");
        assert_eq!(trend(5.0, 10.0), "-50%");
        assert_eq!(trend(5.0, 5.0), "+0%");
        assert_eq!(trend(4.0, 3.0), "+33%");
    }

    #[test]
    fn test_month_bucketing() {
        let now = at(2026, 10, 18);
        assert_eq!(month_bucket(now, at(2026, 10, 1)), Some(5));
        assert_eq!(month_bucket(now, at(2026, 9, 30)), Some(4));
        assert_eq!(month_bucket(now, at(2026, 5, 2)), Some(0));
        assert_eq!(month_bucket(now, at(2026, 4, 28)), None);
        assert_eq!(month_bucket(now, at(2026, 11, 1)), None);
    }

    #[test]
    fn test_month_bucketing_across_year_boundary() {
        let now = at(2027, 2, 10);
        assert_eq!(month_bucket(now, at(2026, 12, 31)), Some(3));
        assert_eq!(month_bucket(now, at(2026, 9, 1)), Some(0));
        assert_eq!(month_bucket(now, at(2026, 8, 31)), None);
    }

    #[test]
    fn test_revenue_sum() {
        assert_eq!(total_revenue(&[], false), 0.0);

        let now = at(2026, 10, 18);
        let bookings = vec![
            booking(100.0, BookingStatus::Pending, now),
            booking(250.0, BookingStatus::Completed, now),
        ];
        assert_eq!(total_revenue(&bookings, false), 350.0);
        assert_eq!(total_revenue(&bookings, true), 250.0);
        assert_eq!(total_bookings(&bookings, true), 1);
    }

    #[test]
    fn test_top_locations_ranked_and_coloured() {
        let tours: Vec<Tour> = ["A", "A", "B", "C", "C", "C"]
            .iter()
            .map(|loc| tour_at(loc, TourType::Regular))
            .collect();

        let top = top_locations(&tours);
        let pairs: Vec<(&str, usize)> = top.iter().map(|l| (l.name.as_str(), l.count)).collect();
        assert_eq!(pairs, vec![("C", 3), ("A", 2), ("B", 1)]);
        assert_eq!(top[0].color, LOCATION_PALETTE[0]);
        assert_eq!(top[2].color, LOCATION_PALETTE[2]);
    }

    #[test]
    fn test_top_locations_capped_at_five() {
        let tours: Vec<Tour> = ["A", "B", "C", "D", "E", "F", "F"]
            .iter()
            .map(|loc| tour_at(loc, TourType::Combo))
            .collect();

        let top = top_locations(&tours);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].name, "F");
        assert_eq!(top[1].name, "A");
    }

    #[test]
    fn test_distributions() {
        let now = at(2026, 10, 18);
        let bookings = vec![
            booking(10.0, BookingStatus::Pending, now),
            booking(10.0, BookingStatus::Pending, now),
            booking(10.0, BookingStatus::Cancelled, now),
        ];
        let dist = status_distribution(&bookings);
        assert_eq!((dist.pending, dist.confirmed, dist.cancelled, dist.completed), (2, 0, 1, 0));

        let tours = vec![
            tour_at("Hue", TourType::Regular),
            tour_at("Hue", TourType::Combo),
            tour_at("Hoi An", TourType::Combo),
        ];
        assert_eq!(tour_type_distribution(&tours), TourTypeDistribution { regular: 1, combo: 2 });
    }

    #[test]
    fn test_monthly_series_labels_and_sums() {
        let now = at(2026, 3, 15);
        let bookings = vec![
            booking(100.0, BookingStatus::Completed, at(2026, 3, 1)),
            booking(50.0, BookingStatus::Confirmed, at(2026, 3, 2)),
            booking(70.0, BookingStatus::Completed, at(2025, 12, 20)),
            booking(999.0, BookingStatus::Completed, at(2025, 6, 20)),
        ];

        let series = monthly_series(now, &bookings, false);
        let labels: Vec<&str> = series.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
        assert_eq!(series[5].bookings, 2);
        assert_eq!(series[5].revenue, 150.0);
        assert_eq!(series[2].revenue, 70.0);
        assert_eq!(series.iter().map(|m| m.bookings).sum::<usize>(), 3);

        let completed = monthly_series(now, &bookings, true);
        assert_eq!(completed[5].revenue, 100.0);
    }

    #[test]
    fn test_dashboard_trends_and_recent() {
        let now = at(2026, 10, 18);
        let bookings = vec![
            booking(200.0, BookingStatus::Confirmed, at(2026, 10, 2)),
            booking(100.0, BookingStatus::Completed, at(2026, 10, 5)),
            booking(100.0, BookingStatus::Completed, at(2026, 9, 5)),
        ];

        let stats = build_dashboard(now, &bookings, &[], &[]);
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.total_revenue, 400.0);
        assert_eq!(stats.bookings_trend, "+100%");
        assert_eq!(stats.revenue_trend, "+200%");
        assert_eq!(stats.recent_bookings.len(), 3);
        assert_eq!(stats.recent_bookings[0].total_price, 100.0);
        assert_eq!(stats.recent_bookings[0].created_at, at(2026, 10, 5));
    }

    #[test]
    fn test_report_tour_performance_sorted_by_revenue() {
        let now = at(2026, 10, 18);
        let cheap = tour_at("Sapa", TourType::Regular);
        let pricey = tour_at("Da Nang", TourType::Combo);

        let mut b1 = booking(100.0, BookingStatus::Completed, now);
        b1.tour_id = cheap.id.unwrap();
        let mut b2 = booking(500.0, BookingStatus::Completed, now);
        b2.tour_id = pricey.id.unwrap();
        let mut b3 = booking(80.0, BookingStatus::Cancelled, now);
        b3.tour_id = cheap.id.unwrap();

        let report = build_report(now, &[b1, b2, b3], &[cheap, pricey], true);
        assert_eq!(report.total_bookings, 2);
        assert_eq!(report.average_booking_value, 300.0);
        assert_eq!(report.tour_performance.len(), 2);
        assert_eq!(report.tour_performance[0].title, "Da Nang tour");
        assert_eq!(report.tour_performance[1].revenue, 100.0);
    }
}
