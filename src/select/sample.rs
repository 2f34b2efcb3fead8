use rand::seq::SliceRandom;
use rand::Rng;

/// Sample proportionally from each group, keeping the groups' ratios.
///
/// Each non-empty group contributes `max(1, round(total_n * |group| / grand_total))`
/// items, capped at the group size. Groups are visited in the given order.
pub fn stratified_sample<T, R>(groups: &[(String, Vec<T>)], total_n: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let grand_total: usize = groups.iter().map(|(_, items)| items.len()).sum();
    if grand_total == 0 {
        return Vec::new();
    }
    let mut selected = Vec::new();
    for (_, items) in groups {
        if items.is_empty() {
            continue;
        }
        let share = (total_n as f64 * items.len() as f64 / grand_total as f64).round() as usize;
        let n = share.max(1).min(items.len());
        selected.extend(items.choose_multiple(rng, n).cloned());
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn keeps_group_ratios() {
        let groups = vec![
            ("S".to_string(), (0..80).collect::<Vec<u32>>()),
            ("T".to_string(), (100..118).collect()),
            ("Y".to_string(), (200..202).collect()),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let picked = stratified_sample(&groups, 10, &mut rng);
        assert_eq!(picked.iter().filter(|v| **v < 100).count(), 8);
        assert_eq!(picked.iter().filter(|v| (100..200).contains(*v)).count(), 2);
        // 10 * 2 / 100 rounds to 0 but every group gets at least one.
        assert_eq!(picked.iter().filter(|v| **v >= 200).count(), 1);
    }

    #[test]
    fn empty_groups_yield_nothing() {
        let groups: Vec<(String, Vec<u8>)> = vec![("S".into(), vec![])];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(stratified_sample(&groups, 5, &mut rng).is_empty());
    }
}
