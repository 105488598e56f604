use chrono::{Days, NaiveDate};
use sitsclust::{analyze, CurationPolicy, DendroConfig, Observation, Sample, SampleCollection};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Three land-cover classes with 16-day NDVI profiles over one season.
    // One forest sample is deliberately labelled "Pasture".
    let profiles: [(&str, [f64; 6]); 3] = [
        ("Forest", [0.82, 0.83, 0.84, 0.83, 0.82, 0.81]),
        ("Cerrado", [0.55, 0.60, 0.52, 0.40, 0.35, 0.45]),
        ("Pasture", [0.30, 0.45, 0.60, 0.50, 0.30, 0.25]),
    ];
    let start = NaiveDate::from_ymd_opt(2019, 9, 1).ok_or("bad date")?;

    let mut samples = Vec::new();
    for (label, base) in &profiles {
        for k in 0..6 {
            samples.push(make_sample(label, base, 0.003 * k as f64, start)?);
        }
    }
    samples.push(make_sample("Pasture", &profiles[0].1, 0.001, start)?);
    let samples = SampleCollection::new(samples)?;

    let config = DendroConfig::from_toml_str(
        r#"
        linkage = "ward"
        index = "ari"

        [distance]
        kind = "dtw"
        "#,
    )?;
    let analysis = analyze(&samples, &config)?;

    println!(
        "best cut: height={:.4} clusters={} ARI={:.3}",
        analysis.height,
        analysis.n_clusters(),
        analysis.score.value
    );
    for eval in &analysis.evaluations {
        println!(
            "  h={:.4} k={:>2} score={:.3}{}",
            eval.height,
            eval.n_clusters,
            eval.score.value,
            if eval.score.degenerate { " (degenerate)" } else { "" }
        );
    }

    let table = &analysis.contingency;
    let freq = table.frequencies();
    for (row, label) in table.labels().iter().enumerate() {
        let cells: Vec<String> = (0..table.n_clusters())
            .map(|c| format!("{:>6.1}%", freq[(row, c)]))
            .collect();
        println!("{label:>10} {}", cells.join(" "));
    }

    let cleaned = analysis.curate(&samples, &CurationPolicy::Clean { min_perc: 0.3 })?;
    println!("clean: removed samples {:?}", cleaned.removed);

    let strict = analysis.curate(&samples, &CurationPolicy::Remove { min_perc: 0.99 })?;
    println!("remove: removed samples {:?}", strict.removed);

    println!(
        "merge records: {}",
        serde_json::to_string(analysis.dendrogram.merge_records())?
    );
    Ok(())
}

fn make_sample(
    label: &str,
    base: &[f64],
    jitter: f64,
    start: NaiveDate,
) -> Result<Sample, Box<dyn std::error::Error>> {
    let mut time_series = Vec::with_capacity(base.len());
    for (t, v) in base.iter().enumerate() {
        let date = start
            .checked_add_days(Days::new(16 * t as u64))
            .ok_or("date overflow")?;
        let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
        time_series.push(Observation::new(date, vec![v + sign * jitter]));
    }
    let end_date = time_series.last().map_or(start, |o| o.date);
    Ok(Sample {
        longitude: -47.9,
        latitude: -15.8,
        start_date: start,
        end_date,
        label: label.to_string(),
        bands: vec!["NDVI".to_string()],
        time_series,
    })
}
