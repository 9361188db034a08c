//! Property-based tests for the partition invariants.

use llamada::cluster::{partition, FieldSpec};
use llamada::config::EngineConfig;
use llamada::record::Record;
use proptest::prelude::*;

fn record(age: u8, income: u8, gender: u8, brand: u8, city: u8) -> Record {
    Record {
        age_bracket: format!("{}-{}", 18 + 5 * age as u32, 22 + 5 * age as u32),
        income_bracket: format!("band{}", income),
        gender: format!("G{}", gender),
        profession: "Salaried".to_string(),
        brand: format!("B{}", brand),
        city_id: format!("{}", city),
        city_name: None,
        day: "Monday".to_string(),
        hour: 10,
        pickup_rate: 40.0,
        call_duration: 200.0,
        total_calls: None,
    }
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    // Small value pools force both qualifying groups and leftovers
    prop::collection::vec(
        (0u8..3, 0u8..3, 0u8..2, 0u8..2, 0u8..2),
        0..200,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(age, income, gender, brand, city)| record(age, income, gender, brand, city))
            .collect()
    })
}

proptest! {
    /// Every record is covered exactly once, whatever the input.
    #[test]
    fn prop_partition_covers_every_record_once(
        records in arb_records(),
        min_cluster_size in 1usize..40,
    ) {
        let spec = FieldSpec::default_calling_fields().unwrap();
        let config = EngineConfig { min_cluster_size, ..Default::default() };
        let result = partition(&records, &spec, &config).unwrap();

        let mut seen = vec![0usize; records.len()];
        for cluster in &result.clusters {
            for &m in &cluster.members {
                seen[m] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&count| count == 1));
        prop_assert!(result.assigned.iter().all(|a| a.is_some()));
    }

    /// Non-leftover clusters always meet the minimum size; at most one
    /// leftover cluster exists and only when records remain.
    #[test]
    fn prop_size_invariant(
        records in arb_records(),
        min_cluster_size in 1usize..40,
    ) {
        let spec = FieldSpec::default_calling_fields().unwrap();
        let config = EngineConfig { min_cluster_size, ..Default::default() };
        let result = partition(&records, &spec, &config).unwrap();

        let mut leftover_count = 0;
        for cluster in &result.clusters {
            prop_assert_eq!(cluster.lead_count, cluster.members.len());
            if cluster.merged_from_leftovers {
                leftover_count += 1;
                prop_assert!(cluster.lead_count > 0);
            } else {
                prop_assert!(cluster.lead_count >= min_cluster_size);
            }
        }
        prop_assert!(leftover_count <= 1);
    }

    /// Identical input and configuration reproduce identical clusters.
    #[test]
    fn prop_determinism(records in arb_records()) {
        let spec = FieldSpec::default_calling_fields().unwrap();
        let config = EngineConfig { min_cluster_size: 10, ..Default::default() };

        let first = partition(&records, &spec, &config).unwrap();
        let second = partition(&records, &spec, &config).unwrap();

        prop_assert_eq!(first.clusters.len(), second.clusters.len());
        for (a, b) in first.clusters.iter().zip(&second.clusters) {
            prop_assert_eq!(&a.values, &b.values);
            prop_assert_eq!(&a.members, &b.members);
        }
        prop_assert_eq!(first.assigned, second.assigned);
    }
}
