use std::env;
use std::fs;
use std::process;

use serde::Serialize;
use xenograft::{BioClassifier, LabelNormalizer, SeedVocabulary, build_equivalence, load_pack_json};

#[derive(Debug)]
struct Args {
    pack_path: String,
    min_cluster_size: usize,
    top_clusters: usize,
    json_out: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut pack_path = None;
    let mut min_cluster_size = 2;
    let mut top_clusters = usize::MAX;
    let mut json_out = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--min-cluster-size" => {
                let value = args.next().ok_or("--min-cluster-size needs a value")?;
                min_cluster_size = value
                    .parse()
                    .map_err(|_| format!("bad --min-cluster-size: {value}"))?;
            }
            "--top" => {
                let value = args.next().ok_or("--top needs a value")?;
                top_clusters = value.parse().map_err(|_| format!("bad --top: {value}"))?;
            }
            "--json-out" => {
                json_out = Some(args.next().ok_or("--json-out needs a path")?);
            }
            other if pack_path.is_none() => pack_path = Some(other.to_string()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(Args {
        pack_path: pack_path.ok_or("usage: audit_part_clusters <pack.json> [options]")?,
        min_cluster_size,
        top_clusters,
        json_out,
    })
}

#[derive(Debug, Serialize)]
struct JsonReport {
    parts_total: usize,
    clusters_total: usize,
    clusters_reported: usize,
    clusters: Vec<JsonCluster>,
}

#[derive(Debug, Serialize)]
struct JsonCluster {
    key: String,
    is_seed: bool,
    size: usize,
    members: Vec<String>,
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };

    let json = match fs::read_to_string(&args.pack_path) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("cannot read {}: {err}", args.pack_path);
            process::exit(1);
        }
    };
    let registry = match load_pack_json(&json) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("cannot load {}: {err}", args.pack_path);
            process::exit(1);
        }
    };

    let vocab = SeedVocabulary::standard();
    let mut normalizer = LabelNormalizer::new();
    let mut classifier = BioClassifier::new();
    let map = build_equivalence(&registry, &vocab, &mut normalizer, &mut classifier);

    let part_name = |id| {
        registry
            .part(id)
            .map(|p| p.def_name.clone())
            .unwrap_or_else(|| format!("#{}", id.index()))
    };

    let mut clusters: Vec<JsonCluster> = map
        .entries()
        .map(|(id, entry)| {
            let mut members: Vec<String> =
                map.equivalence_of(id).into_iter().map(part_name).collect();
            members.sort();
            JsonCluster {
                key: part_name(id),
                is_seed: entry.is_seed,
                size: members.len(),
                members,
            }
        })
        .filter(|cluster| cluster.size >= args.min_cluster_size)
        .collect();
    clusters.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.key.cmp(&b.key)));

    let clusters_total = clusters.len();
    clusters.truncate(args.top_clusters);

    println!(
        "{} parts, {} cluster entries ({} at size >= {})",
        registry.part_count(),
        map.len(),
        clusters_total,
        args.min_cluster_size
    );
    for cluster in &clusters {
        let marker = if cluster.is_seed { " [seed]" } else { "" };
        println!(
            "  {}{} ({}): {}",
            cluster.key,
            marker,
            cluster.size,
            cluster.members.join(", ")
        );
    }

    if let Some(path) = &args.json_out {
        let report = JsonReport {
            parts_total: registry.part_count(),
            clusters_total,
            clusters_reported: clusters.len(),
            clusters,
        };
        let json = serde_json::to_string_pretty(&report).expect("report serializes");
        if let Err(err) = fs::write(path, json) {
            eprintln!("cannot write {path}: {err}");
            process::exit(1);
        }
    }
}
