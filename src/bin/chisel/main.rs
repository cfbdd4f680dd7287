//! Chisel CLI - runs editing operators on built-in primitives.
//!
//! Usage: chisel <COMMAND> [OPTIONS]
//!
//! Run `chisel --help` for available commands.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};

use chisel::algo::extrude::{ExtrudeOptions, ExtrudeTool};
use chisel::algo::inset::{inset_faces, InsetMode, InsetOptions};
use chisel::algo::loop_cut::{create_loop_cut, LoopCutOptions};
use chisel::algo::subdivide::{self, SubdivisionScheme};
use chisel::algo::{triangulate, Progress};
use chisel::mesh::{primitives, FaceId, HalfEdgeMesh, VertexId};
use chisel::selection::{Element, Selection, SelectionType};

#[derive(Parser)]
#[command(name = "chisel")]
#[command(author, version, about = "Mesh editing CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        #[command(flatten)]
        source: Source,
    },

    /// Extrude faces
    Extrude {
        #[command(flatten)]
        source: Source,

        /// Faces to extrude (default: every face)
        #[arg(short, long, value_delimiter = ',')]
        faces: Vec<usize>,

        /// Extrusion distance
        #[arg(short, long, default_value = "1.0")]
        distance: f64,

        /// Extrude each face on its own
        #[arg(long)]
        individual: bool,
    },

    /// Inset faces
    Inset {
        #[command(flatten)]
        source: Source,

        /// Faces to inset (default: every face)
        #[arg(short, long, value_delimiter = ',')]
        faces: Vec<usize>,

        /// Inset distance
        #[arg(short, long, default_value = "0.1")]
        amount: f64,

        /// Push the inset faces along their normal
        #[arg(long, default_value = "0.0")]
        depth: f64,

        /// Inset connected faces as one region
        #[arg(long)]
        region: bool,
    },

    /// Insert edge loops across a quad strip
    Loopcut {
        #[command(flatten)]
        source: Source,

        /// Origin vertex of the seed edge
        #[arg(long, default_value = "0")]
        from: usize,

        /// Target vertex of the seed edge
        #[arg(long, default_value = "1")]
        to: usize,

        /// Number of loops
        #[arg(short = 'n', long, default_value = "1")]
        cuts: usize,
    },

    /// Subdivide a mesh
    Subdivide {
        #[command(flatten)]
        source: Source,

        /// Subdivision method
        #[arg(short, long, value_enum, default_value = "catmull-clark")]
        method: SubdivideMethod,

        /// Number of subdivision levels
        #[arg(short, long, default_value = "1")]
        levels: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Fan-triangulate every face
    Triangulate {
        #[command(flatten)]
        source: Source,
    },
}

/// Which primitive to start from.
#[derive(Args)]
struct Source {
    /// Primitive shape
    #[arg(short, long, value_enum, default_value = "cube")]
    shape: Shape,

    /// Edge length of the primitive
    #[arg(long, default_value = "2.0")]
    size: f64,

    /// Cells per side for the grid shape
    #[arg(long, default_value = "4")]
    resolution: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    Cube,
    Tetrahedron,
    Quad,
    Triangle,
    Grid,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SubdivideMethod {
    /// Catmull-Clark subdivision (any polygons)
    CatmullClark,
    /// Loop subdivision (for triangle meshes)
    Loop,
    /// Doo-Sabin subdivision
    DooSabin,
    /// Modified Butterfly subdivision (for triangle meshes)
    Butterfly,
    /// Linear midpoint subdivision
    Simple,
}

impl From<SubdivideMethod> for SubdivisionScheme {
    fn from(method: SubdivideMethod) -> Self {
        match method {
            SubdivideMethod::CatmullClark => SubdivisionScheme::CatmullClark,
            SubdivideMethod::Loop => SubdivisionScheme::Loop,
            SubdivideMethod::DooSabin => SubdivisionScheme::DooSabin,
            SubdivideMethod::Butterfly => SubdivisionScheme::Butterfly,
            SubdivideMethod::Simple => SubdivisionScheme::Simple,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { source } => {
            let mesh = source.build()?;
            print_info(&mesh);
        }

        Commands::Extrude {
            source,
            faces,
            distance,
            individual,
        } => {
            cmd_extrude(&source, &faces, distance, individual)?;
        }

        Commands::Inset {
            source,
            faces,
            amount,
            depth,
            region,
        } => {
            cmd_inset(&source, &faces, amount, depth, region)?;
        }

        Commands::Loopcut { source, from, to, cuts } => {
            cmd_loopcut(&source, from, to, cuts)?;
        }

        Commands::Subdivide {
            source,
            method,
            levels,
            sequential,
        } => {
            cmd_subdivide(&source, method, levels, sequential)?;
        }

        Commands::Triangulate { source } => {
            let mut mesh = source.build()?;
            let created = triangulate::triangulate_with_progress(&mut mesh, &create_progress())?;
            println!("Created {} triangles", created);
            print_info(&mesh);
        }
    }

    Ok(())
}

impl Source {
    fn build(&self) -> chisel::error::Result<HalfEdgeMesh> {
        match self.shape {
            Shape::Cube => primitives::cube(self.size),
            Shape::Tetrahedron => primitives::tetrahedron(self.size),
            Shape::Quad => primitives::quad(self.size),
            Shape::Triangle => primitives::triangle(),
            Shape::Grid => primitives::grid(self.resolution, self.resolution, self.size),
        }
    }
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever move forward.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (raw_percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, raw_percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn print_info(mesh: &HalfEdgeMesh) {
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Euler characteristic: {}", mesh.euler_characteristic());
    println!("Surface area: {:.6}", mesh.surface_area());

    if let Some(bbox) = mesh.bounding_box() {
        let diag = bbox.extent();
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    if mesh.is_triangle_mesh() {
        println!("Mesh type: Triangle mesh");
    } else if mesh.is_quad_mesh() {
        println!("Mesh type: Quad mesh");
    } else {
        println!("Mesh type: Mixed polygon mesh");
    }

    println!("Manifold: {}", mesh.is_manifold());
    if mesh.is_closed() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary loops)", mesh.boundary_loops().len());
    }

    let report = mesh.validate();
    if !report.is_ok() {
        println!("Validation: {}", report);
    }
}

/// Select the listed faces, or every face when the list is empty.
fn select_faces(mesh: &mut HalfEdgeMesh, faces: &[usize]) -> Selection {
    let selection = Selection::new(SelectionType::Face);
    if faces.is_empty() {
        selection.select_all(mesh);
    } else {
        for f in faces.iter().filter_map(|&f| FaceId::try_new(f)) {
            selection.select(mesh, Element::Face(f), true);
        }
    }
    selection
}

fn cmd_extrude(source: &Source, faces: &[usize], distance: f64, individual: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = source.build()?;
    let selection = select_faces(&mut mesh, faces);

    let options = if individual {
        ExtrudeOptions::individual()
    } else {
        ExtrudeOptions::default()
    };
    let mut tool = ExtrudeTool::new(options);

    let start = Instant::now();
    tool.begin(&mut mesh, &selection)?;
    tool.update(&mut mesh, distance)?;
    let created = tool.created_faces().len();
    tool.confirm(&mut mesh)?;
    let elapsed = start.elapsed();

    println!("Extruded {} faces by {} ({:.2?})", selection.selected_count(&mesh), distance, elapsed);
    println!("Created {} faces", created);
    print_info(&mesh);

    Ok(())
}

fn cmd_inset(
    source: &Source,
    faces: &[usize],
    amount: f64,
    depth: f64,
    region: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = source.build()?;
    let selection = select_faces(&mut mesh, faces);
    let targets = selection.selected_faces(&mesh);

    let mode = if region { InsetMode::Region } else { InsetMode::Individual };
    let options = InsetOptions::new(amount).with_depth(depth).with_mode(mode);

    let start = Instant::now();
    let result = inset_faces(&mut mesh, &targets, &options)?;
    let elapsed = start.elapsed();

    println!(
        "Inset {} faces: {} inner, {} bridge ({:.2?})",
        targets.len(),
        result.inner_faces.len(),
        result.bridge_faces.len(),
        elapsed
    );
    print_info(&mesh);

    Ok(())
}

fn cmd_loopcut(source: &Source, from: usize, to: usize, cuts: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh = source.build()?;
    let seed = VertexId::try_new(from)
        .zip(VertexId::try_new(to))
        .and_then(|(a, b)| mesh.find_halfedge(a, b))
        .ok_or_else(|| format!("no edge from vertex {} to vertex {}", from, to))?;

    let start = Instant::now();
    let loops = create_loop_cut(&mut mesh, seed, &LoopCutOptions::new(cuts))?;
    let elapsed = start.elapsed();

    let crossed: usize = loops.iter().map(|l| l.vertices.len()).sum();
    println!("Inserted {} loops through {} edges ({:.2?})", loops.len(), crossed, elapsed);
    print_info(&mesh);

    Ok(())
}

fn cmd_subdivide(
    source: &Source,
    method: SubdivideMethod,
    levels: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = source.build()?;

    println!("Input: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let options = subdivide::SubdivideOptions::new(levels)
        .with_scheme(method.into())
        .with_parallel(!sequential);
    let mode = if sequential { "sequential" } else { "parallel" };
    let progress = create_progress();

    println!("Subdividing ({} levels, {})...", levels, mode);
    let start = Instant::now();
    let result = subdivide::subdivide_with_progress(&mesh, &options, &progress)?;
    let elapsed = start.elapsed();

    println!("Done in {:.2?}", elapsed);
    print_info(&result);

    Ok(())
}
