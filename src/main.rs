use anyhow::Context;
use clap::Parser;
use env_logger::{Builder, Env};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

mod assets;
mod config;
mod error;
mod frame;
mod lv;
mod renderer;
mod utility;

use assets::AssetManager;
use config::{Args, RendererConfig};
use renderer::VkRenderer;

// Constants
const WINDOW_TITLE: &str = "Hello, Vulkan!";

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = RendererConfig::from(Args::parse());
    log::debug!("{:?}", config);

    run(config).inspect_err(|err| log::error!("An error occurred: {:#}", err))
}

fn run(config: RendererConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to make event loop")?;
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_resizable(false)
        .build(&event_loop)
        .context("Failed to create window")?;

    let assets = AssetManager::new(&config.assets);
    let mut renderer = Some(
        VkRenderer::new(&window, &assets, &config).context("Failed to initialise the renderer")?,
    );
    let mut failure: Option<anyhow::Error> = None;

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(|event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                log::info!("Exiting application!");
                // The renderer goes first so the surface never outlives its window.
                renderer = None;
                elwt.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(active) = renderer.as_mut() {
                    if let Err(err) = active.render() {
                        failure = Some(anyhow::Error::new(err).context("Failed to render a frame"));
                        renderer = None;
                        elwt.exit();
                    }
                }
            }
            _ => (),
        },
        Event::AboutToWait => window.request_redraw(),
        _ => (),
    })?;

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
