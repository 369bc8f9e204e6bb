//! Review documents and the per-doctor rating aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    /// Whole stars, 1 through 5.
    pub rating: u8,
    pub review: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate rating figures for one doctor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    pub count: usize,
    /// Mean rating rounded to one decimal, `None` when there are no reviews.
    pub average: Option<f64>,
    /// Buckets for 1 through 5 stars, in that order.
    pub distribution: [RatingBucket; 5],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingBucket {
    pub stars: u8,
    pub count: usize,
    /// Whole percent of all reviews, rounded half-up.
    pub percent: u32,
}

impl RatingStats {
    pub fn empty() -> Self {
        let mut distribution = [RatingBucket::default(); 5];
        for (i, bucket) in distribution.iter_mut().enumerate() {
            bucket.stars = (i + 1) as u8;
        }
        Self {
            count: 0,
            average: None,
            distribution,
        }
    }

    /// Aggregates raw star ratings. Stored reviews are always in range;
    /// anything else is skipped rather than poisoning the average.
    pub fn from_ratings(ratings: &[u8]) -> Self {
        let mut counts = [0usize; 5];
        let mut sum = 0u64;
        let mut total = 0usize;
        for &rating in ratings {
            if (1..=5).contains(&rating) {
                counts[(rating - 1) as usize] += 1;
                sum += u64::from(rating);
                total += 1;
            }
        }
        if total == 0 {
            return Self::empty();
        }

        let average = (sum as f64 / total as f64 * 10.0).round() / 10.0;
        let mut distribution = [RatingBucket::default(); 5];
        for (i, bucket) in distribution.iter_mut().enumerate() {
            bucket.stars = (i + 1) as u8;
            bucket.count = counts[i];
            bucket.percent = (counts[i] as f64 / total as f64 * 100.0).round() as u32;
        }

        Self {
            count: total,
            average: Some(average),
            distribution,
        }
    }

    pub fn bucket(&self, stars: u8) -> Option<&RatingBucket> {
        let index = (stars as usize).checked_sub(1)?;
        self.distribution.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_average() {
        let stats = RatingStats::from_ratings(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, None);
        for (i, bucket) in stats.distribution.iter().enumerate() {
            assert_eq!(bucket.stars, (i + 1) as u8);
            assert_eq!(bucket.count, 0);
            assert_eq!(bucket.percent, 0);
        }
    }

    #[test]
    fn uniform_five_stars() {
        let stats = RatingStats::from_ratings(&[5, 5, 5, 5, 5]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.average, Some(5.0));
        let top = stats.bucket(5).unwrap();
        assert_eq!(top.count, 5);
        assert_eq!(top.percent, 100);
        assert_eq!(stats.bucket(4).unwrap().count, 0);
    }

    #[test]
    fn average_rounds_half_up_to_one_decimal() {
        // 11 / 3 = 3.666..., shown as 3.7
        let stats = RatingStats::from_ratings(&[3, 4, 4]);
        assert_eq!(stats.average, Some(3.7));

        // 9 / 2 = 4.5 stays 4.5
        let stats = RatingStats::from_ratings(&[4, 5]);
        assert_eq!(stats.average, Some(4.5));
    }

    #[test]
    fn distribution_percentages_round_half_up() {
        let stats = RatingStats::from_ratings(&[5, 5, 3]);
        // 2/3 -> 66.67 -> 67, 1/3 -> 33.33 -> 33
        assert_eq!(stats.bucket(5).unwrap().percent, 67);
        assert_eq!(stats.bucket(3).unwrap().percent, 33);
        assert_eq!(stats.bucket(1).unwrap().percent, 0);
    }

    #[test]
    fn one_of_each_star() {
        let stats = RatingStats::from_ratings(&[1, 2, 3, 4, 5]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.average, Some(3.0));
        for stars in 1..=5u8 {
            let bucket = stats.bucket(stars).unwrap();
            assert_eq!(bucket.count, 1);
            assert_eq!(bucket.percent, 20);
        }
        assert!(stats.bucket(0).is_none());
        assert!(stats.bucket(6).is_none());
    }
}
