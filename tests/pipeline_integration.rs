//! End-to-end pipeline tests over the library API.

use llamada::cluster::FieldSpec;
use llamada::config::EngineConfig;
use llamada::pipeline;
use llamada::record::Record;

fn record(gender: &str, brand: &str, city: &str, hour: u8, pickup: f32) -> Record {
    Record {
        age_bracket: "23-27".to_string(),
        income_bracket: "5-10L".to_string(),
        gender: gender.to_string(),
        profession: "Salaried".to_string(),
        brand: brand.to_string(),
        city_id: city.to_string(),
        city_name: None,
        day: "Monday".to_string(),
        hour,
        pickup_rate: pickup,
        call_duration: 200.0,
        total_calls: Some(10),
    }
}

fn default_spec() -> FieldSpec {
    FieldSpec::default_calling_fields().unwrap()
}

/// The stock minimum cluster size of 6000 is enforced with default
/// configuration.
#[test]
fn test_default_min_cluster_size_enforced() {
    let spec = default_spec();
    let config = EngineConfig::default();

    let qualifying: Vec<Record> = (0..6000)
        .map(|i| record("F", "Acme", "1", (9 + i % 3) as u8, 40.0))
        .collect();
    let analysis = pipeline::analyze(&qualifying, &spec, &config).unwrap();
    assert_eq!(analysis.clusters.len(), 1);
    assert!(!analysis.clusters[0].merged_from_leftovers);
    assert_eq!(analysis.clusters[0].lead_count, 6000);

    let undersized: Vec<Record> = (0..5999)
        .map(|i| record("F", "Acme", "1", (9 + i % 3) as u8, 40.0))
        .collect();
    let analysis = pipeline::analyze(&undersized, &spec, &config).unwrap();
    assert_eq!(analysis.clusters.len(), 1);
    assert!(analysis.clusters[0].merged_from_leftovers);
    assert_eq!(analysis.clusters[0].lead_count, 5999);
}

/// A mixed population ends up fully covered: qualifying groups become
/// clusters, the rest merge into the leftover cluster.
#[test]
fn test_mixed_population_coverage() {
    let config = EngineConfig {
        min_cluster_size: 100,
        min_samples: 10,
        ..Default::default()
    };
    let spec = default_spec();

    let mut records = Vec::new();
    for i in 0..300 {
        records.push(record("F", "Acme", "1", (9 + i % 2) as u8, 45.0));
    }
    for i in 0..150 {
        records.push(record("M", "Zeta", "2", (14 + i % 2) as u8, 25.0));
    }
    for i in 0..40 {
        records.push(record(
            "M",
            &format!("Rare{}", i),
            &format!("{}", 50 + i),
            10,
            30.0,
        ));
    }

    let analysis = pipeline::analyze(&records, &spec, &config).unwrap();

    let total_members: usize = analysis.clusters.iter().map(|c| c.lead_count).sum();
    assert_eq!(total_members, 490);

    let leftovers: Vec<_> = analysis
        .clusters
        .iter()
        .filter(|c| c.merged_from_leftovers)
        .collect();
    assert_eq!(leftovers.len(), 1);
    assert_eq!(leftovers[0].lead_count, 40);

    for cluster in &analysis.clusters {
        if !cluster.merged_from_leftovers {
            assert!(cluster.lead_count >= 100);
            // Qualifying clusters get windows and scores
            assert!(!cluster.patterns.is_empty());
            assert!(cluster.quality > 0.0);
        }
    }
}

/// Patterns carry best-time flags: exactly 3 when enough exist.
#[test]
fn test_best_time_flags_through_pipeline() {
    let config = EngineConfig {
        min_cluster_size: 100,
        min_samples: 10,
        ..Default::default()
    };

    let mut records = Vec::new();
    for i in 0..400 {
        let hour = match i % 4 {
            0 => 9,
            1 => 12,
            2 => 15,
            _ => 18,
        };
        let pickup = 20.0 + 10.0 * (i % 4) as f32;
        records.push(record("F", "Acme", "1", hour, pickup));
    }

    let analysis = pipeline::analyze(&records, &default_spec(), &config).unwrap();
    let cluster = &analysis.clusters[0];
    assert!(cluster.patterns.len() >= 4);
    assert_eq!(cluster.patterns.iter().filter(|p| p.best_time).count(), 3);
}

/// Re-running the whole pipeline reproduces identical output.
#[test]
fn test_pipeline_determinism() {
    let config = EngineConfig {
        min_cluster_size: 50,
        min_samples: 5,
        ..Default::default()
    };
    let mut records = Vec::new();
    for i in 0..500 {
        records.push(record(
            if i % 2 == 0 { "F" } else { "M" },
            if i % 3 == 0 { "Acme" } else { "Zeta" },
            &format!("{}", i % 7),
            (8 + i % 12) as u8,
            20.0 + (i % 50) as f32,
        ));
    }

    let first = pipeline::analyze(&records, &default_spec(), &config).unwrap();
    let second = pipeline::analyze(&records, &default_spec(), &config).unwrap();

    assert_eq!(first.clusters.len(), second.clusters.len());
    for (a, b) in first.clusters.iter().zip(&second.clusters) {
        assert_eq!(a.values, b.values);
        assert_eq!(a.members, b.members);
        assert_eq!(a.quality, b.quality);
        assert_eq!(a.success_probability, b.success_probability);
        assert_eq!(a.predictive_score, b.predictive_score);
        let labels_a: Vec<_> = a.patterns.iter().map(|p| &p.label).collect();
        let labels_b: Vec<_> = b.patterns.iter().map(|p| &p.label).collect();
        assert_eq!(labels_a, labels_b);
    }
}
