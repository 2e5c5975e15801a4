//! Chisel CLI - exercise the sculpting engine on procedural meshes.
//!
//! Usage: chisel [-v|-q] <COMMAND> [OPTIONS]
//!
//! Run `chisel --help` for available commands.
//!
//! # Logging
//!
//! `-v` enables info logging for the engine, `-vv` debug, `-vvv` trace. `RUST_LOG`
//! overrides the flags, e.g. `RUST_LOG=chisel=debug chisel build`.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Point3;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chisel::algo::{centroid_scan, CameraView, PointerKind, Progress, SmoothOptions};
use chisel::bvh::coordinator::{BuildRequest, BuildResponse, IndexBuildCoordinator};
use chisel::bvh::{IndexOptions, SpatialIndex};
use chisel::mesh::{build_adjacency, primitives, Adjacency, MeshAsset, MeshId, ModelId, VertexId};
use chisel::session::{PointerId, SculptConfig, SculptSession, SculptTool, SurfaceHit};

#[derive(Parser)]
#[command(name = "chisel")]
#[command(author, version, about = "Mesh sculpting engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Suppress all log output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh, adjacency and spatial index statistics
    Info {
        /// Procedural shape
        #[arg(short, long, value_enum, default_value = "sphere")]
        shape: Shape,

        /// Shape resolution (grid cells per side, or sphere rings)
        #[arg(short = 'n', long, default_value = "64")]
        resolution: usize,

        /// Maximum triangles per BVH leaf
        #[arg(long, default_value = "32")]
        leaf_size: usize,
    },

    /// Compare indexed sphere queries against a brute-force centroid scan
    Query {
        /// Procedural shape
        #[arg(short, long, value_enum, default_value = "sphere")]
        shape: Shape,

        /// Shape resolution (grid cells per side, or sphere rings)
        #[arg(short = 'n', long, default_value = "128")]
        resolution: usize,

        /// Number of queries
        #[arg(short, long, default_value = "1000")]
        queries: usize,

        /// Query radius as a fraction of the bounding-sphere radius
        #[arg(short, long, default_value = "0.1")]
        radius: f32,

        /// Maximum triangles per BVH leaf
        #[arg(long, default_value = "32")]
        leaf_size: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Apply brush strokes to a jittered mesh through a sculpt session
    Smooth {
        /// Procedural shape
        #[arg(short, long, value_enum, default_value = "grid")]
        shape: Shape,

        /// Shape resolution (grid cells per side, or sphere rings)
        #[arg(short = 'n', long, default_value = "64")]
        resolution: usize,

        /// Number of stroke samples
        #[arg(long, default_value = "50")]
        samples: usize,

        /// Pointer kind driving the stroke
        #[arg(short, long, value_enum, default_value = "mouse")]
        pointer: Pointer,

        /// Blend factor (0.0 to 1.0)
        #[arg(short, long, default_value = "0.35")]
        blend: f32,

        /// Jitter amplitude as a fraction of the bounding-sphere radius
        #[arg(long, default_value = "0.01")]
        jitter: f32,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Build spatial indices for several models on the background worker
    Build {
        /// Number of models to submit
        #[arg(short, long, default_value = "4")]
        models: usize,

        /// Meshes per model
        #[arg(long, default_value = "3")]
        meshes: usize,

        /// Procedural shape
        #[arg(short, long, value_enum, default_value = "sphere")]
        shape: Shape,

        /// Shape resolution (grid cells per side, or sphere rings)
        #[arg(short = 'n', long, default_value = "96")]
        resolution: usize,

        /// Bound on queued build requests
        #[arg(long, default_value = "16")]
        queue: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Flat square grid in the XZ plane
    Grid,
    /// UV sphere of radius 1
    Sphere,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Pointer {
    /// Mouse (20 px brush)
    Mouse,
    /// Pen (24 px brush)
    Pen,
    /// Touch (48 px brush)
    Touch,
}

impl From<Pointer> for PointerKind {
    fn from(p: Pointer) -> Self {
        match p {
            Pointer::Mouse => PointerKind::Mouse,
            Pointer::Pen => PointerKind::Pen,
            Pointer::Touch => PointerKind::Touch,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "chisel=info",
            2 => "chisel=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info {
            shape,
            resolution,
            leaf_size,
        } => {
            cmd_info(shape, resolution, leaf_size)?;
        }

        Commands::Query {
            shape,
            resolution,
            queries,
            radius,
            leaf_size,
            sequential,
        } => {
            cmd_query(shape, resolution, queries, radius, leaf_size, sequential)?;
        }

        Commands::Smooth {
            shape,
            resolution,
            samples,
            pointer,
            blend,
            jitter,
            sequential,
        } => {
            cmd_smooth(shape, resolution, samples, pointer.into(), blend, jitter, sequential)?;
        }

        Commands::Build {
            models,
            meshes,
            shape,
            resolution,
            queue,
            sequential,
        } => {
            cmd_build(models, meshes, shape, resolution, queue, sequential)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        let percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Builds of different models finish out of order; never move backwards
        let previous = max_percent.fetch_max(percent, Ordering::Relaxed);
        if percent <= previous && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
            max_percent.store(0, Ordering::Relaxed);
        }
    })
}

fn make_shape(shape: Shape, id: &str, resolution: usize) -> MeshAsset {
    let resolution = resolution.max(2);
    match shape {
        Shape::Grid => primitives::grid(id, resolution, 2.0 / resolution as f32),
        Shape::Sphere => primitives::uv_sphere(id, resolution, resolution * 2, 1.0),
    }
}

/// Deterministic value in `(-1, 1)` for a seed.
fn hash_unit(seed: usize) -> f32 {
    ((seed as f32 * 12.9898).sin() * 43758.547).fract()
}

/// Deterministic point inside the box `[min, max]`.
fn sample_point(seed: usize, min: &Point3<f32>, max: &Point3<f32>) -> Point3<f32> {
    let t = |k: usize| 0.5 * (hash_unit(seed * 3 + k) + 1.0);
    Point3::new(
        min.x + (max.x - min.x) * t(0),
        min.y + (max.y - min.y) * t(1),
        min.z + (max.z - min.z) * t(2),
    )
}

/// Mean distance from each vertex to the centroid of its neighbours.
fn roughness(mesh: &MeshAsset, adjacency: &Adjacency) -> f32 {
    let mut total = 0.0;
    let mut counted = 0usize;
    for v in mesh.vertex_ids() {
        let neighbors = adjacency.neighbors(v);
        if neighbors.is_empty() {
            continue;
        }
        let sum = neighbors
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, &n| acc + mesh.position(n).coords);
        let centroid = sum / neighbors.len() as f32;
        total += (mesh.position(v).coords - centroid).norm();
        counted += 1;
    }
    if counted == 0 {
        0.0
    } else {
        total / counted as f32
    }
}

fn cmd_info(shape: Shape, resolution: usize, leaf_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = make_shape(shape, "shape", resolution);

    println!("Vertices: {}", mesh.num_vertices());
    println!("Triangles: {}", mesh.num_triangles());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    if let Some((center, radius)) = mesh.bounding_sphere() {
        println!(
            "Bounding sphere: center ({:.3}, {:.3}, {:.3}), radius {:.4}",
            center.x, center.y, center.z, radius
        );
    }

    let start = Instant::now();
    let adjacency = build_adjacency(mesh.indices(), mesh.num_vertices());
    let adjacency_time = start.elapsed();

    let valences: Vec<usize> = mesh.vertex_ids().map(|v| adjacency.valence(v)).collect();
    let min_valence = valences.iter().copied().min().unwrap_or(0);
    let max_valence = valences.iter().copied().max().unwrap_or(0);
    let avg_valence = valences.iter().sum::<usize>() as f64 / valences.len().max(1) as f64;
    println!(
        "Valence: min={}, max={}, avg={:.2} ({} isolated) [{:.2?}]",
        min_valence,
        max_valence,
        avg_valence,
        adjacency.isolated_vertices().count(),
        adjacency_time
    );

    let options = IndexOptions::default().with_leaf_size(leaf_size);
    let start = Instant::now();
    let index = SpatialIndex::from_mesh(&mesh, &options);
    let index_time = start.elapsed();
    println!(
        "Spatial index: {} nodes, {} leaves, depth {}, leaf size {} [{:.2?}]",
        index.nodes().len(),
        index.leaf_count(),
        index.depth(),
        index.leaf_size(),
        index_time
    );

    Ok(())
}

fn cmd_query(
    shape: Shape,
    resolution: usize,
    queries: usize,
    radius: f32,
    leaf_size: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = make_shape(shape, "shape", resolution);
    let (min, max) = mesh.bounding_box().ok_or("mesh has no vertices")?;
    let (_, bounds_radius) = mesh.bounding_sphere().ok_or("mesh has no vertices")?;
    let radius = bounds_radius * radius;

    let options = IndexOptions::default()
        .with_leaf_size(leaf_size)
        .with_parallel(!sequential);
    let start = Instant::now();
    let index = SpatialIndex::from_mesh(&mesh, &options);
    println!(
        "Built index over {} triangles in {:.2?}",
        index.num_triangles(),
        start.elapsed()
    );

    let points: Vec<Point3<f32>> = (0..queries).map(|i| sample_point(i, &min, &max)).collect();

    let mut indexed = Vec::new();
    let mut indexed_hits = Vec::with_capacity(queries);
    let start = Instant::now();
    for p in &points {
        index.query_sphere_into(p, radius, &mut indexed);
        indexed.sort_unstable();
        indexed_hits.push(indexed.clone());
    }
    let indexed_time = start.elapsed();

    let mut scanned = Vec::new();
    let mut mismatches = 0;
    let mut total_hits = 0;
    let start = Instant::now();
    for (p, expected) in points.iter().zip(&indexed_hits) {
        centroid_scan(index.centroids(), p, radius, &mut scanned);
        total_hits += scanned.len();
        if &scanned != expected {
            mismatches += 1;
        }
    }
    let scan_time = start.elapsed();

    println!("Queries: {} (radius {:.4}, {} hits total)", queries, radius, total_hits);
    println!("Indexed:     {:.2?}", indexed_time);
    println!("Brute force: {:.2?}", scan_time);

    if mismatches > 0 {
        return Err(format!("{} of {} queries disagree with the brute-force scan", mismatches, queries).into());
    }
    println!("All queries agree");
    Ok(())
}

fn cmd_smooth(
    shape: Shape,
    resolution: usize,
    samples: usize,
    pointer: PointerKind,
    blend: f32,
    jitter: f32,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = make_shape(shape, "surface", resolution);
    let (_, bounds_radius) = mesh.bounding_sphere().ok_or("mesh has no vertices")?;

    // Push every vertex along its normal by a deterministic amount
    let amplitude = bounds_radius * jitter;
    let updates: Vec<(VertexId, Point3<f32>)> = mesh
        .vertex_ids()
        .map(|v| (v, mesh.position(v) + mesh.normal(v) * amplitude * hash_unit(v.index())))
        .collect();
    mesh.write_positions(&updates);
    mesh.recompute_normals();

    let adjacency = build_adjacency(mesh.indices(), mesh.num_vertices());
    let before = roughness(&mesh, &adjacency);
    println!("Loaded: {} vertices, {} triangles", mesh.num_vertices(), mesh.num_triangles());
    println!("Roughness before: {:.6}", before);

    let config = SculptConfig::default().with_smooth(
        SmoothOptions::default()
            .with_blend(blend)
            .with_parallel(!sequential),
    );
    let mut session = SculptSession::new(config, Box::new(chisel::session::NoopProbe))?;
    let model_id = ModelId::new("model");
    let mesh_id = MeshId::new("surface");
    session.load_model(model_id.clone(), vec![mesh])?;
    session.wait_for_builds(Duration::from_secs(30));
    session.set_active_tool(Some(SculptTool::Smooth));

    // Stroke across the middle of the shape, looking down from above
    let camera = CameraView::from_degrees(Point3::new(0.0, 3.0 * bounds_radius, 0.0), 50.0, 720.0);
    let id = PointerId(1);
    let mut applied = 0;
    let start = Instant::now();
    for i in 0..samples {
        let t = if samples > 1 { i as f32 / (samples - 1) as f32 } else { 0.5 };
        let x = (t - 0.5) * bounds_radius;
        let y = match shape {
            Shape::Grid => 0.0,
            Shape::Sphere => (1.0 - x * x).max(0.0).sqrt(),
        };
        let hit = SurfaceHit::new(model_id.clone(), mesh_id.clone(), Point3::new(x, y, 0.0));
        let update = if i == 0 {
            session.pointer_down(id, pointer, Some(&hit), &camera)
        } else {
            session.pointer_move(id, pointer, Some(&hit), &camera)
        };
        if update.applied {
            applied += 1;
        }
    }
    let stroke = session.pointer_up(id);
    let elapsed = start.elapsed();

    let mesh = session.mesh(&model_id, &mesh_id).ok_or("model disappeared")?;
    let after = roughness(mesh, &adjacency);
    println!(
        "Applied {} of {} samples ({} recorded) in {:.2?}",
        applied,
        samples,
        stroke.map(|s| s.samples).unwrap_or(0),
        elapsed
    );
    println!("Roughness after:  {:.6}", after);

    Ok(())
}

fn cmd_build(
    models: usize,
    meshes: usize,
    shape: Shape,
    resolution: usize,
    queue: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = IndexOptions::default().with_parallel(!sequential);
    let coordinator = IndexBuildCoordinator::spawn_with_progress(options, queue, create_progress())?;

    let start = Instant::now();
    for m in 0..models {
        let payloads = (0..meshes)
            .map(|k| make_shape(shape, &format!("mesh-{}", k), resolution + k).snapshot())
            .collect();
        coordinator.submit(BuildRequest::new(format!("model-{}", m), payloads).with_generation(m as u64))?;
    }

    let mut failures = 0;
    for _ in 0..models {
        match coordinator.recv_timeout(Duration::from_secs(120)) {
            Some(BuildResponse::Complete {
                model_id,
                meshes,
                elapsed,
                ..
            }) => {
                let triangles: usize = meshes.iter().map(|m| m.index.num_triangles()).sum();
                println!(
                    "{}: {} meshes, {} triangles in {:.2?}",
                    model_id,
                    meshes.len(),
                    triangles,
                    elapsed
                );
            }
            Some(BuildResponse::Failed { model_id, message, .. }) => {
                eprintln!("{}: failed: {}", model_id, message);
                failures += 1;
            }
            None => return Err("timed out waiting for builds".into()),
        }
    }
    println!("Built {} models in {:.2?}", models, start.elapsed());

    if failures > 0 {
        return Err(format!("{} builds failed", failures).into());
    }
    Ok(())
}
