use std::env;
use std::fs;
use std::process;

use serde::Serialize;
use xenograft::{Engine, EngineOptions, NoopBridge, load_pack_json};

#[derive(Debug)]
struct Args {
    pack_path: String,
    canonical_body: Option<String>,
    json_out: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut pack_path = None;
    let mut canonical_body = None;
    let mut json_out = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--canonical-body" => {
                canonical_body = Some(args.next().ok_or("--canonical-body needs a value")?);
            }
            "--json-out" => {
                json_out = Some(args.next().ok_or("--json-out needs a path")?);
            }
            other if pack_path.is_none() => pack_path = Some(other.to_string()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(Args {
        pack_path: pack_path.ok_or("usage: audit_procedure_merges <pack.json> [options]")?,
        canonical_body,
        json_out,
    })
}

#[derive(Debug, Serialize)]
struct JsonReport {
    procedures_loaded: usize,
    procedures_remaining: usize,
    merged: usize,
    failed_merges: usize,
    cluster_entries: usize,
    targets_added: usize,
    passes: Vec<JsonPass>,
    display_order: Vec<JsonProcedure>,
}

#[derive(Debug, Serialize)]
struct JsonPass {
    name: String,
    combinations: usize,
    links_added: usize,
    elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct JsonProcedure {
    def_name: String,
    label: String,
    worker: Option<String>,
    target_count: usize,
    offered_by_count: usize,
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
    let mut registry = match load_pack_json(&json) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("cannot load {}: {err}", args.pack_path);
            process::exit(1);
        }
    };
    let procedures_loaded = registry.procedure_count();

    let mut options = EngineOptions::default();
    if let Some(canonical_body) = args.canonical_body {
        options.canonical_body = canonical_body;
    }
    let mut engine = Engine::with_options(options);
    let summary = engine.run(&mut registry, &mut NoopBridge);

    println!(
        "{} procedures in, {} out ({} merged, {} failed merges) in {}ms",
        procedures_loaded,
        summary.procedures_remaining,
        summary.merged,
        summary.failed_merges,
        summary.elapsed.as_millis()
    );
    for pass in &summary.passes {
        println!(
            "  {}: {} links from {} combinations in {}ms",
            pass.name,
            pass.links_added,
            pass.combinations,
            pass.elapsed.as_millis()
        );
    }
    println!("final display order:");
    for proc_id in registry.procedure_ids() {
        let Some(procedure) = registry.procedure(proc_id) else {
            continue;
        };
        println!(
            "  {} ({}) worker={} targets={} offered_by={}",
            procedure.def_name,
            procedure.label,
            procedure
                .worker
                .as_ref()
                .map(|w| w.as_str())
                .unwrap_or("<none>"),
            procedure.targets.len(),
            procedure.offered_by.len()
        );
    }

    if let Some(path) = &args.json_out {
        let display_order = registry
            .procedure_ids()
            .filter_map(|id| registry.procedure(id))
            .map(|procedure| JsonProcedure {
                def_name: procedure.def_name.clone(),
                label: procedure.label.clone(),
                worker: procedure.worker.as_ref().map(|w| w.as_str().to_string()),
                target_count: procedure.targets.len(),
                offered_by_count: procedure.offered_by.len(),
            })
            .collect();
        let report = JsonReport {
            procedures_loaded,
            procedures_remaining: summary.procedures_remaining,
            merged: summary.merged,
            failed_merges: summary.failed_merges,
            cluster_entries: summary.cluster_entries,
            targets_added: summary.expansion.targets_added,
            passes: summary
                .passes
                .iter()
                .map(|pass| JsonPass {
                    name: pass.name.to_string(),
                    combinations: pass.combinations,
                    links_added: pass.links_added,
                    elapsed_ms: pass.elapsed.as_millis() as u64,
                })
                .collect(),
            display_order,
        };
        let json = serde_json::to_string_pretty(&report).expect("report serializes");
        if let Err(err) = fs::write(path, json) {
            eprintln!("cannot write {path}: {err}");
            process::exit(1);
        }
    }
}
