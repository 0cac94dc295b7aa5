use chrono::{DateTime, Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use peak_tracker::models::{Checkin, Location, Peak};
use peak_tracker::stores::{views, DomainState};
use std::hint::black_box;

const PROVINCES: [&str; 6] = ["Shandong", "Shaanxi", "Sichuan", "Yunnan", "Anhui", "Hunan"];

/// 10k peaks and 5k check-ins split between two users.
fn large_state() -> DomainState {
    let peaks = (0..10_000)
        .map(|i| Peak {
            id: format!("p{}", i),
            name: format!("Peak {}", i),
            city: Some(format!("City {}", i % 120)),
            province: Some(PROVINCES[i % PROVINCES.len()].to_string()),
            location: Location::new(20.0 + (i % 20) as f64, 100.0 + (i % 30) as f64),
            altitude: 500 + (i as i64 * 7) % 4000,
            difficulty: 1 + (i as i64 % 5),
            description: String::new(),
            image_url: None,
        })
        .collect();

    let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().expect("valid timestamp");
    let checkins = (0..5_000)
        .map(|i| Checkin {
            id: format!("checkin-{}", i),
            user_id: if i % 2 == 0 { "u1" } else { "u2" }.to_string(),
            peak_id: format!("p{}", (i * 13) % 10_000),
            checkin_time: start + Duration::minutes(i as i64),
            location: Location::default(),
        })
        .collect();

    DomainState {
        peaks,
        checkins,
        search_query: "peak 1".to_string(),
        province_filter: "Sichuan".to_string(),
        ..DomainState::default()
    }
}

fn benchmark_views(c: &mut Criterion) {
    let state = large_state();

    let mut group = c.benchmark_group("derived_views");

    group.bench_function("peaks_with_checkin", |b| {
        b.iter(|| views::peaks_with_checkin(black_box(&state), Some("u1")))
    });

    group.bench_function("stats", |b| {
        b.iter(|| views::stats(black_box(&state), Some("u1")))
    });

    group.bench_function("filtered_peaks", |b| {
        b.iter(|| views::filtered_peaks(black_box(&state)).len())
    });

    group.bench_function("cities", |b| b.iter(|| views::cities(black_box(&state))));

    group.finish();
}

criterion_group!(benches, benchmark_views);
criterion_main!(benches);
