use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use doctree_core::{BatchType, Document, Position, Range};
use tracing_subscriber::EnvFilter;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    implementation: &'static str,
    storage: &'static str,
    workload: String,
    timestamp: String,
    name: String,
    total_ops: u64,
    duration_ms: f64,
    ops_per_sec: f64,
    extra: Extra,
    source_file: Option<String>,
}

#[derive(serde::Serialize)]
struct Extra {
    count: u64,
    version: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut count: u64 = 200;
    let mut out_file: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--count=") {
            count = val.parse().unwrap_or(count);
        } else if let Some(val) = arg.strip_prefix("--out=") {
            out_file = Some(PathBuf::from(val));
        }
    }

    let mut doc = Document::new();
    doc.create_root("main", "$root").expect("create root");

    let start = Instant::now();
    // Type one paragraph char by char, bold every other char, then remove the tail.
    let paragraph = Position::new("main", vec![0]).expect("position");
    doc.change(BatchType::Regular, |writer| writer.insert_element(&paragraph, "paragraph"))
        .expect("insert paragraph");
    for i in 0..count {
        let at = Position::new("main", vec![0, i as usize]).expect("position");
        doc.change(BatchType::Regular, |writer| writer.insert_text(&at, "x"))
            .expect("type");
    }
    for i in (0..count).step_by(2) {
        let start = Position::new("main", vec![0, i as usize]).expect("position");
        let range = Range::from_position_and_shift(&start, 1);
        doc.change(BatchType::Regular, |writer| writer.set_attribute(&range, "bold", true))
            .expect("bold");
    }
    let tail = Range::new(
        Position::new("main", vec![0, (count / 2) as usize]).expect("position"),
        Position::new("main", vec![0, count as usize]).expect("position"),
    )
    .expect("range");
    let removal = doc
        .change(BatchType::Regular, |writer| writer.remove(&tail))
        .expect("remove");
    doc.undo(&removal).expect("undo");
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let total_ops = doc.version();
    let output = Output {
        implementation: "doctree-core",
        storage: "memory",
        workload: format!("type-format-undo-{}", count),
        timestamp: chrono::Utc::now().to_rfc3339(),
        name: format!("type-format-undo-{}", count),
        total_ops,
        duration_ms,
        ops_per_sec: if duration_ms > 0.0 {
            total_ops as f64 / duration_ms * 1000.0
        } else {
            f64::INFINITY
        },
        extra: Extra {
            count,
            version: doc.version(),
        },
        source_file: out_file.as_ref().map(|p| p.display().to_string()),
    };

    let json = serde_json::to_string_pretty(&output).expect("serialize");
    if let Some(path) = out_file {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdirs");
        }
        fs::write(&path, &json).expect("write output");
    }
    println!("{}", json);
}
