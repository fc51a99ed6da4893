#[cfg(target_arch = "wasm32")]
fn main() {
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("tract_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;
    use std::fmt::Write as _;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};
    use tract_engine::fiber::{FiberStore, IngestDiagnostics, IngestOptions};
    use tract_engine::geom::{FiberMetrics, LineSet, LineSetSource, TimingBucket};

    const SNAPSHOT_QUANTIZE: f64 = 1e-6;
    const SNAPSHOT_DECIMALS: usize = 6;

    const USAGE: &str = r#"tract_cli (tract-engine)

USAGE:
  tract_cli list
  tract_cli run <scenario|all> [options]

SCENARIOS:
  helix_bundle
  outlier_rejection
  cluster_pair

OPTIONS (run):
  --out-dir <dir>    Write <scenario>.obj and/or <scenario>.snap to this dir (required for `all`)
  --obj <path>       Write OBJ polylines (single scenario only)
  --snap <path>      Write snapshot (single scenario only)
  --no-obj           Skip OBJ when using --out-dir
  --no-snap          Skip snapshot when using --out-dir
  --points <n>       Samples per fiber (default 20)
  --overwrite        Overwrite existing output files
  -h, --help         Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_scenarios();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_scenarios() {
        for scenario in Scenario::ALL {
            println!("{}", scenario.name());
        }
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut out_dir: Option<PathBuf> = None;
        let mut obj_path: Option<PathBuf> = None;
        let mut snap_path: Option<PathBuf> = None;
        let mut overwrite = false;
        let mut write_obj = true;
        let mut write_snap = true;
        let mut options = IngestOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => out_dir = Some(args.value::<PathBuf>("--out-dir")?),
                "--obj" => obj_path = Some(args.value::<PathBuf>("--obj")?),
                "--snap" => snap_path = Some(args.value::<PathBuf>("--snap")?),
                "--points" => options = IngestOptions::new(args.value::<usize>("--points")?),
                "--overwrite" => overwrite = true,
                "--no-obj" => write_obj = false,
                "--no-snap" => write_snap = false,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        if let Some(dir) = out_dir.as_ref() {
            if obj_path.is_some() || snap_path.is_some() {
                return Err("use either --out-dir or --obj/--snap (not both)".to_string());
            }
            if !write_obj && !write_snap {
                return Err("nothing to write (both --no-obj and --no-snap set)".to_string());
            }

            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;

            if scenario_name == "all" {
                for scenario in Scenario::ALL {
                    run_one_scenario_to_dir(*scenario, &options, dir, write_obj, write_snap, overwrite)?;
                }
                return Ok(());
            }

            let scenario = Scenario::from_str(scenario_name.as_str())
                .ok_or_else(|| unknown_scenario(&scenario_name))?;
            return run_one_scenario_to_dir(scenario, &options, dir, write_obj, write_snap, overwrite);
        }

        if scenario_name == "all" {
            return Err("`run all` requires --out-dir".to_string());
        }

        let scenario =
            Scenario::from_str(scenario_name.as_str()).ok_or_else(|| unknown_scenario(&scenario_name))?;
        let output = run_scenario(scenario, &options)?;

        if let Some(path) = snap_path.as_deref() {
            write_text_file(path, &output.snapshot, overwrite)?;
            eprintln!("wrote {}", path.display());
        } else {
            print!("{}", output.snapshot);
        }

        if let Some(path) = obj_path.as_deref() {
            write_obj_file(path, &output.line_set, output.name, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        print_summary(&output);
        Ok(())
    }

    fn run_one_scenario_to_dir(
        scenario: Scenario,
        options: &IngestOptions,
        dir: &Path,
        write_obj: bool,
        write_snap: bool,
        overwrite: bool,
    ) -> Result<(), String> {
        let output = run_scenario(scenario, options)?;

        if write_snap {
            let path = dir.join(format!("{}.snap", output.name));
            write_text_file(&path, &output.snapshot, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        if write_obj {
            let path = dir.join(format!("{}.obj", output.name));
            write_obj_file(&path, &output.line_set, output.name, overwrite)?;
            eprintln!("wrote {}", path.display());
        }

        print_summary(&output);
        Ok(())
    }

    fn print_summary(output: &ScenarioOutput) {
        let diag = &output.diagnostics;
        eprintln!(
            "{}: fibers={} exported={} samples={} source_points={} undersampled={}",
            output.name,
            diag.fiber_count,
            output.line_set.line_count(),
            diag.points_per_fiber,
            diag.source_point_count,
            diag.undersampled_fiber_count
        );
        if let Some(report) = output.metrics.end() {
            eprintln!(
                "{}: ingest={}ns attach={}ns copy={}ns extract={}ns export={}ns total={:.3}ms",
                output.name,
                report.ingest_ns,
                report.scalar_attach_ns,
                report.scalar_copy_ns,
                report.extraction_ns,
                report.export_ns,
                report.total_ms()
            );
        }
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = String::new();
        let _ = writeln!(msg, "unknown scenario `{name}`\n\navailable scenarios:");
        for scenario in Scenario::ALL {
            let _ = writeln!(msg, "  {}", scenario.name());
        }
        msg
    }

    /// Creates the parent directory of `path`; an existing file is an error
    /// unless `overwrite` is set.
    fn prepare_output(path: &Path, overwrite: bool) -> Result<(), String> {
        if !overwrite && path.exists() {
            return Err(format!("{} already exists (pass --overwrite)", path.display()));
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .map_err(|e| format!("create dir {}: {e}", parent.display())),
            _ => Ok(()),
        }
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        prepare_output(path, overwrite)?;
        fs::write(path, with_trailing_newline(text)).map_err(|e| format!("write {}: {e}", path.display()))
    }

    fn write_obj_file(path: &Path, line_set: &LineSet, name: &str, overwrite: bool) -> Result<(), String> {
        if !line_set.has_valid_indices() {
            return Err(format!("{name}: line set references missing points"));
        }
        if line_set.has_invalid_points() {
            return Err(format!("{name}: line set contains non-finite points"));
        }

        prepare_output(path, overwrite)?;
        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "# tract-engine tract_cli").map_err(|e| format!("write obj: {e}"))?;
        writeln!(w, "o {name}").map_err(|e| format!("write obj: {e}"))?;

        for p in line_set.points.iter().copied() {
            writeln!(w, "v {} {} {}", p[0], p[1], p[2]).map_err(|e| format!("write obj: {e}"))?;
        }

        // OBJ indices are 1-based.
        for line in &line_set.lines {
            let mut record = String::from("l");
            for id in line {
                let _ = write!(record, " {}", id + 1);
            }
            writeln!(w, "{record}").map_err(|e| format!("write obj: {e}"))?;
        }

        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    /// Unix line endings, ending in exactly one newline.
    fn with_trailing_newline(text: &str) -> String {
        let mut out = text.lines().collect::<Vec<_>>().join("\n");
        out.push('\n');
        out
    }

    /// Rounds to the snapshot grid; negative zero prints as zero.
    fn snap_to_grid(value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let snapped = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
        if snapped == 0.0 { 0.0 } else { snapped }
    }

    fn write_f64(out: &mut String, value: f64) {
        let _ = write!(out, "{:.SNAPSHOT_DECIMALS$}", snap_to_grid(value));
    }

    fn write_f64_row(out: &mut String, prefix: &str, values: &[f64]) {
        out.push_str(prefix);
        for value in values.iter().copied() {
            out.push(' ');
            write_f64(out, value);
        }
        out.push('\n');
    }

    fn write_diagnostics(out: &mut String, diag: &IngestDiagnostics) {
        let _ = writeln!(out, "ingest.fibers {}", diag.fiber_count);
        let _ = writeln!(out, "ingest.points_per_fiber {}", diag.points_per_fiber);
        let _ = writeln!(out, "ingest.source_points {}", diag.source_point_count);
        let _ = writeln!(out, "ingest.undersampled {}", diag.undersampled_fiber_count);
    }

    fn write_store(out: &mut String, store: &FiberStore) -> Result<(), String> {
        let all: Vec<usize> = (0..store.fiber_count()).collect();
        let lengths = store.arc_lengths(&all).map_err(|e| e.to_string())?;
        let names: Vec<String> = store.scalar_names().map(str::to_owned).collect();

        let _ = writeln!(out, "store.fibers {}", store.fiber_count());
        let _ = writeln!(out, "store.points_per_fiber {}", store.points_per_fiber());
        let _ = writeln!(out, "store.scalars {}", names.join(" "));

        for fiber in all {
            let _ = writeln!(out, "fiber {fiber}");
            let mut length = String::new();
            write_f64(&mut length, lengths[fiber]);
            let _ = writeln!(out, "  length {length}");

            let coords = store.fiber(fiber).map_err(|e| e.to_string())?;
            for sample in 0..coords.len() {
                write_f64_row(
                    out,
                    "  v",
                    &[coords.x[sample], coords.y[sample], coords.z[sample]],
                );
            }
            for name in &names {
                let row = store.scalar(fiber, name).map_err(|e| e.to_string())?;
                write_f64_row(out, &format!("  s {name}"), &row);
            }
            if let Some(label) = store.cluster_label(fiber).map_err(|e| e.to_string())? {
                let _ = writeln!(out, "  cluster {label}");
            }
        }
        Ok(())
    }

    fn snapshot(scenario: &str, sections: impl FnOnce(&mut String) -> Result<(), String>) -> Result<String, String> {
        let mut out = String::new();
        let _ = writeln!(out, "# tract-engine snapshot v1");
        let _ = writeln!(out, "scenario {scenario}");
        let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
        sections(&mut out)?;
        Ok(with_trailing_newline(&out))
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        HelixBundle,
        OutlierRejection,
        ClusterPair,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::HelixBundle,
            Scenario::OutlierRejection,
            Scenario::ClusterPair,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::HelixBundle => "helix_bundle",
                Scenario::OutlierRejection => "outlier_rejection",
                Scenario::ClusterPair => "cluster_pair",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            match name {
                "helix_bundle" => Some(Scenario::HelixBundle),
                "outlier_rejection" => Some(Scenario::OutlierRejection),
                "cluster_pair" => Some(Scenario::ClusterPair),
                _ => None,
            }
        }
    }

    struct ScenarioOutput {
        name: &'static str,
        line_set: LineSet,
        diagnostics: IngestDiagnostics,
        metrics: FiberMetrics,
        snapshot: String,
    }

    fn run_scenario(scenario: Scenario, options: &IngestOptions) -> Result<ScenarioOutput, String> {
        match scenario {
            Scenario::HelixBundle => scenario_helix_bundle(options),
            Scenario::OutlierRejection => scenario_outlier_rejection(options),
            Scenario::ClusterPair => scenario_cluster_pair(options),
        }
    }

    fn jitter(rng: &mut StdRng, amount: f64) -> f64 {
        (rng.random::<f64>() - 0.5) * amount
    }

    /// Straight fibers along +x with jittered points and uneven sampling.
    fn straight_fibers(rng: &mut StdRng, count: usize, origin: [f64; 3], length: f64) -> Vec<Vec<[f64; 3]>> {
        (0..count)
            .map(|fiber| {
                let source_points = 4 + 3 * fiber;
                let y = origin[1] + fiber as f64 * 0.25;
                (0..source_points)
                    .map(|i| {
                        let t = i as f64 / (source_points - 1) as f64;
                        [
                            origin[0] + t * length,
                            y + jitter(rng, 0.05),
                            origin[2] + jitter(rng, 0.05),
                        ]
                    })
                    .collect()
            })
            .collect()
    }

    fn ingest(
        geometry: &LineSet,
        options: &IngestOptions,
        metrics: &mut FiberMetrics,
    ) -> Result<(FiberStore, IngestDiagnostics), String> {
        let mut store = FiberStore::new();
        let diagnostics = metrics
            .time(TimingBucket::Ingest, || store.ingest_line_set(geometry, options))
            .map_err(|e| e.to_string())?;
        Ok((store, diagnostics))
    }

    /// Scalar proportional to the x coordinate of every source point.
    fn attach_x_scalar(
        store: &mut FiberStore,
        geometry: &LineSet,
        name: &str,
        scale: f64,
        metrics: &mut FiberMetrics,
    ) -> Result<(), String> {
        let values: Vec<f64> = geometry.points.iter().map(|p| p[0] * scale).collect();
        let points_per_fiber = store.points_per_fiber();
        metrics
            .time(TimingBucket::ScalarAttach, || {
                store.attach_scalar(geometry, &values, name, points_per_fiber)
            })
            .map_err(|e| e.to_string())
    }

    fn scenario_helix_bundle(options: &IngestOptions) -> Result<ScenarioOutput, String> {
        let name = Scenario::HelixBundle.name();
        let mut rng = StdRng::seed_from_u64(7);
        let mut metrics = FiberMetrics::default();
        metrics.begin();

        // Source counts straddle the default sample count so fibers are both
        // up- and downsampled.
        let polylines: Vec<Vec<[f64; 3]>> = (0..6)
            .map(|fiber| {
                let source_points = 8 + 6 * fiber;
                let phase = fiber as f64 * std::f64::consts::FRAC_PI_3;
                (0..source_points)
                    .map(|i| {
                        let t = i as f64 / (source_points - 1) as f64;
                        let angle = phase + t * std::f64::consts::TAU;
                        [
                            angle.cos() + jitter(&mut rng, 0.02),
                            angle.sin() + jitter(&mut rng, 0.02),
                            t * 4.0,
                        ]
                    })
                    .collect()
            })
            .collect();
        let geometry = LineSet::from_polylines(&polylines);

        let (mut store, diagnostics) = ingest(&geometry, options, &mut metrics)?;
        attach_x_scalar(&mut store, &geometry, "x", 1.0, &mut metrics)?;

        let line_set = metrics
            .time(TimingBucket::Export, || store.to_line_set(&[]))
            .map_err(|e| e.to_string())?;
        let snapshot = metrics.time(TimingBucket::Extraction, || {
            snapshot(name, |out| {
                write_diagnostics(out, &diagnostics);
                write_store(out, &store)
            })
        })?;

        Ok(ScenarioOutput {
            name,
            line_set,
            diagnostics,
            metrics,
            snapshot,
        })
    }

    fn scenario_outlier_rejection(options: &IngestOptions) -> Result<ScenarioOutput, String> {
        let name = Scenario::OutlierRejection.name();
        let mut rng = StdRng::seed_from_u64(11);
        let mut metrics = FiberMetrics::default();
        metrics.begin();

        let mut polylines = straight_fibers(&mut rng, 8, [0.0, 0.0, 0.0], 10.0);
        // Zig-zag fibers, several times longer than the straight ones.
        for fiber in 0..2 {
            let y = 3.0 + fiber as f64;
            polylines.push(
                (0..21)
                    .map(|i| {
                        let amplitude = if i % 2 == 0 { 0.0 } else { 4.0 };
                        [i as f64 * 0.5, y + amplitude, jitter(&mut rng, 0.05)]
                    })
                    .collect(),
            );
        }
        let geometry = LineSet::from_polylines(&polylines);

        let (mut store, diagnostics) = ingest(&geometry, options, &mut metrics)?;
        attach_x_scalar(&mut store, &geometry, "FA", 0.1, &mut metrics)?;

        let all: Vec<usize> = (0..store.fiber_count()).collect();
        let lengths = metrics
            .time(TimingBucket::Extraction, || store.arc_lengths(&all))
            .map_err(|e| e.to_string())?;
        let mut sorted = lengths.clone();
        sorted.sort_by(f64::total_cmp);
        let median = sorted[sorted.len() / 2];
        let outliers: Vec<usize> = lengths
            .iter()
            .enumerate()
            .filter(|(_, length)| **length > median * 1.5)
            .map(|(fiber, _)| fiber)
            .collect();

        let kept_arrays = metrics
            .time(TimingBucket::Extraction, || store.fibers(&all, &outliers))
            .map_err(|e| e.to_string())?;
        let mut kept = FiberStore::from_fiber_arrays(&kept_arrays).map_err(|e| e.to_string())?;
        metrics
            .time(TimingBucket::ScalarCopy, || {
                kept.copy_scalars(&store, &["FA"], None, &outliers)
            })
            .map_err(|e| e.to_string())?;

        let line_set = metrics
            .time(TimingBucket::Export, || store.to_line_set(&outliers))
            .map_err(|e| e.to_string())?;
        let snapshot = snapshot(name, |out| {
            write_diagnostics(out, &diagnostics);
            write_f64_row(out, "median_length", &[median]);
            let excluded: Vec<String> = outliers.iter().map(usize::to_string).collect();
            let _ = writeln!(out, "excluded {}", excluded.join(" "));
            write_store(out, &kept)
        })?;

        Ok(ScenarioOutput {
            name,
            line_set,
            diagnostics,
            metrics,
            snapshot,
        })
    }

    fn scenario_cluster_pair(options: &IngestOptions) -> Result<ScenarioOutput, String> {
        let name = Scenario::ClusterPair.name();
        let mut rng = StdRng::seed_from_u64(23);
        let mut metrics = FiberMetrics::default();
        metrics.begin();

        let mut polylines = straight_fibers(&mut rng, 4, [0.0, 0.0, 0.0], 6.0);
        polylines.extend(straight_fibers(&mut rng, 3, [0.0, 0.0, 5.0], 6.0));
        let labels: Vec<usize> = polylines
            .iter()
            .map(|fiber| usize::from(fiber[0][2] > 2.5))
            .collect();
        let geometry = LineSet::from_polylines(&polylines);

        let (mut store, diagnostics) = ingest(&geometry, options, &mut metrics)?;

        // Centroid of a label: mean resampled fiber, flattened as x, y, z per sample.
        let mut centroids = BTreeMap::new();
        for label in [0, 1] {
            let members: Vec<usize> = (0..labels.len()).filter(|&f| labels[f] == label).collect();
            let arrays = metrics
                .time(TimingBucket::Extraction, || store.fibers(&members, &[]))
                .map_err(|e| e.to_string())?;
            let mut centroid = vec![0.0; store.points_per_fiber() * 3];
            for fiber in 0..arrays.len() {
                for sample in 0..store.points_per_fiber() {
                    centroid[sample * 3] += arrays.x[fiber][sample];
                    centroid[sample * 3 + 1] += arrays.y[fiber][sample];
                    centroid[sample * 3 + 2] += arrays.z[fiber][sample];
                }
            }
            let count = arrays.len() as f64;
            centroid.iter_mut().for_each(|value| *value /= count);
            centroids.insert(label, centroid);
        }
        store
            .annotate_clusters(&labels, &centroids)
            .map_err(|e| e.to_string())?;

        let line_set = metrics
            .time(TimingBucket::Export, || store.to_line_set(&[]))
            .map_err(|e| e.to_string())?;
        let snapshot = snapshot(name, |out| {
            write_diagnostics(out, &diagnostics);
            for label in store.clusters().labels() {
                let members: Vec<String> = store
                    .cluster_members(label)
                    .iter()
                    .map(usize::to_string)
                    .collect();
                let _ = writeln!(out, "cluster {label} members {}", members.join(" "));
                let centroid = store.centroid(label).map_err(|e| e.to_string())?;
                write_f64_row(out, &format!("cluster {label} centroid"), &centroid);
            }
            write_store(out, &store)
        })?;

        Ok(ScenarioOutput {
            name,
            line_set,
            diagnostics,
            metrics,
            snapshot,
        })
    }

    /// Command-line words after the program name.
    struct Args(std::vec::IntoIter<String>);

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self(args.into_iter())
        }

        fn next(&mut self) -> Option<String> {
            self.0.next()
        }

        /// Parses the word following `flag`.
        fn value<T>(&mut self, flag: &str) -> Result<T, String>
        where
            T: std::str::FromStr,
            T::Err: std::fmt::Display,
        {
            let raw = self.next().ok_or_else(|| format!("{flag} expects a value"))?;
            raw.parse()
                .map_err(|e| format!("invalid value `{raw}` for {flag}: {e}"))
        }
    }
}
