use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use skysphere::app::App;
use skysphere::data::{BrightStarCatalog, FigureCatalog, MeanElementsEphemeris};
use skysphere::layers::grid::GridConfig;
use skysphere::layers::{ConstellationsLayer, GridLayer, Layer, PlanetsLayer, StarsLayer};
use skysphere::renderer::SkyRenderer;

#[derive(Parser, Debug)]
#[command(name = "skysphere")]
#[command(about = "Real-time celestial sphere viewer", version)]
struct Args {
    /// Initial field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    fov: f32,

    /// Dimmest magnitude stars to draw
    #[arg(long, default_value_t = 6.5)]
    limit_star_mag: f32,

    /// Dimmest magnitude stars to label
    #[arg(long, default_value_t = 3.0)]
    limit_label_mag: f32,

    /// Number of right-ascension grid meridians
    #[arg(long, default_value_t = 12)]
    ra_lines: u32,

    /// Declination divisions between equator and pole
    #[arg(long, default_value_t = 9)]
    dec_lines: u32,

    /// Draw the ecliptic on the coordinate grid
    #[arg(long)]
    ecliptic: bool,

    /// Hide constellation figures
    #[arg(long)]
    no_constellations: bool,

    /// Hide solar-system bodies
    #[arg(long)]
    no_planets: bool,

    /// Start in night mode (toggle with 'n')
    #[arg(long)]
    night: bool,

    /// Optional path override for the star catalog CSV
    #[arg(long)]
    star_catalog: Option<String>,

    /// Optional path override for the constellation figures CSV
    #[arg(long)]
    constellations_path: Option<String>,

    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
}

/// Assemble the layer stack and view state from the CLI arguments.
fn build_renderer(args: &Args) -> Result<SkyRenderer> {
    let mut sky = SkyRenderer::new();

    let grid = GridLayer::with_config(GridConfig {
        ra_lines: args.ra_lines,
        dec_lines: args.dec_lines,
        show_ecliptic: args.ecliptic,
        ..GridConfig::default()
    });
    grid.initialize();
    sky.add_layer(Arc::new(grid));

    if !args.no_constellations {
        let figures = FigureCatalog::load(args.constellations_path.as_deref())?;
        let constellations = ConstellationsLayer::new(figures);
        constellations.initialize();
        sky.add_layer(Arc::new(constellations));
    }

    let catalog = BrightStarCatalog::load(args.star_catalog.as_deref())?;
    let stars = StarsLayer::with_limits(catalog, args.limit_star_mag, args.limit_label_mag, true);
    stars.initialize();
    sky.add_layer(Arc::new(stars));

    if !args.no_planets {
        let planets = PlanetsLayer::new(MeanElementsEphemeris::new());
        planets.initialize();
        sky.add_layer(Arc::new(planets));
    }

    sky.view_mut().set_fov(args.fov);
    sky.set_night_mode(args.night);
    Ok(sky)
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let sky = build_renderer(&args)?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Skysphere")
            .with_inner_size(winit::dpi::LogicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), sky))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting");
                                elwt.exit();
                            }
                            Err(e) => log::error!("render error: {e:?}"),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
