use crate::data::NutrientDataset;

/// Nutrient profile of a bundle at one portion unit per slot.
///
/// Duplicate foods contribute once per slot.
pub fn profile(foods: &[usize], data: &NutrientDataset) -> Vec<f64> {
    let mut profile = vec![0.0; data.channel_len];
    for &food in foods {
        for (total, value) in profile.iter_mut().zip(data.food_nutrients(food)) {
            *total += value;
        }
    }
    profile
}

/// One-sided violation of `[required, limit]` summed over every channel.
///
/// Zero iff the profile lies within all bounds.
pub fn violation(profile: &[f64], required: &[f64], limit: &[f64]) -> f64 {
    profile
        .iter()
        .zip(required.iter().zip(limit))
        .map(|(p, (r, l))| (r - p).max(0.0) + (p - l).max(0.0))
        .sum()
}

/// Fitness of a bundle: lower is better, 0 means every bound is met at unit portions.
pub fn evaluate(foods: &[usize], data: &NutrientDataset) -> f64 {
    violation(&profile(foods, data), &data.required, &data.limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn worked_dataset() -> NutrientDataset {
        NutrientDataset::new(
            vec![vec![4.0, 1.0], vec![2.0, 3.0], vec![1.0, 1.0]],
            vec![10.0, 5.0],
            vec![20.0, 15.0],
        )
        .unwrap()
    }

    #[test]
    fn test_profile_sums_slots() {
        let data = worked_dataset();
        assert_eq!(profile(&[0, 1, 2], &data), vec![7.0, 5.0]);
        assert_eq!(profile(&[0, 0], &data), vec![8.0, 2.0]);
        assert_eq!(profile(&[], &data), vec![0.0, 0.0]);
    }

    #[test]
    fn test_violation_lower_and_upper() {
        // 3 short on the first channel, within bounds on the second
        assert_eq!(evaluate(&[0, 1, 2], &worked_dataset()), 3.0);
        // profile [24, 6]: 4 above the limit of the first channel
        assert_eq!(evaluate(&[0, 0, 0, 0, 0, 0], &worked_dataset()), 4.0);
        // profile [1, 1]: short on both channels
        assert_eq!(evaluate(&[2], &worked_dataset()), 13.0);
    }

    #[test]
    fn test_zero_iff_within_bounds() {
        let data = worked_dataset();
        // [4,1]*2 + [2,3] = [10, 5]: exactly on the lower bounds
        assert_eq!(evaluate(&[0, 0, 1], &data), 0.0);
        // [4,1]*5 = [20, 5]: on the upper limit of channel 0
        assert_eq!(evaluate(&[0, 0, 0, 0, 0], &data), 0.0);
        // one more slot breaks the limit
        assert!(evaluate(&[0, 0, 0, 0, 0, 2], &data) > 0.0);
    }

    #[test]
    fn test_infinite_limit_never_violated() {
        let data = NutrientDataset::new(vec![vec![1000.0]], vec![1.0], vec![f64::INFINITY]).unwrap();
        assert_eq!(evaluate(&[0, 0, 0], &data), 0.0);
    }

    #[test]
    fn test_fitness_is_non_negative_on_random_bundles() {
        let data = worked_dataset();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let size = rng.gen_range(1..10);
            let bundle: Vec<usize> = (0..size).map(|_| rng.gen_range(0..data.food_len)).collect();
            let fit = evaluate(&bundle, &data);
            let p = profile(&bundle, &data);
            let within = p
                .iter()
                .zip(data.required.iter().zip(&data.limit))
                .all(|(v, (r, l))| v >= r && v <= l);
            assert!(fit >= 0.0);
            assert_eq!(fit == 0.0, within, "bundle {:?} profile {:?}", bundle, p);
        }
    }
}
