use anyhow::{ensure, Context};
use clap::Parser;
use lora_hat_gateway::constants::DEFAULT_BUFFER_CAPACITY;
use lora_hat_gateway::logging::{init_logger_with_default, log_warn};
use lora_hat_gateway::{http, log_info, GatewayService, RadioHandle, ReceiveLoopConfig};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lora-hat-gateway")]
#[command(about = "HTTP gateway for Raspberry Pi LoRa HATs (RFM9x)")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// HTTP port
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Received packets held between polls
    #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,

    /// Run without radio hardware
    #[arg(long)]
    simulate: bool,

    /// SPI bus the HAT is on
    #[arg(long, default_value_t = 0)]
    spi_bus: u8,

    /// SPI chip select (1 = CE1)
    #[arg(long, default_value_t = 1)]
    chip_select: u8,

    /// Radio reset pin (BCM numbering)
    #[arg(long, default_value_t = 25)]
    reset_pin: u8,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger_with_default(&cli.log_level);

    ensure!(cli.buffer_capacity > 0, "--buffer-capacity must be at least 1");

    log_info("LoRa HAT gateway starting");
    let radio = select_radio(&cli);
    log_info(&format!("LoRa available: {}", radio.has_hardware()));

    let service = Arc::new(GatewayService::new(radio, cli.buffer_capacity));
    log_info(&format!("Buffering up to {} packets", service.buffer_capacity()));
    let receiver = service.start(ReceiveLoopConfig::default());

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log_info(&format!("Listening on http://{addr}"));

    axum::serve(listener, http::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    receiver.shutdown().await;
    log_info("Gateway stopped");
    Ok(())
}

fn select_radio(cli: &Cli) -> RadioHandle {
    if cli.simulate {
        log_info("Simulation mode requested, no radio will be used");
        return RadioHandle::simulated();
    }

    #[cfg(feature = "raspberry-pi")]
    let radio = {
        use lora_hat_gateway::radio::hal::Rfm9xPins;
        use lora_hat_gateway::radio::Rfm9xFactory;

        RadioHandle::hardware(Rfm9xFactory::raspberry_pi(Rfm9xPins {
            spi_bus: cli.spi_bus,
            chip_select: cli.chip_select,
            reset: cli.reset_pin,
        }))
    };

    #[cfg(not(feature = "raspberry-pi"))]
    let radio = {
        log_warn(&format!(
            "Built without raspberry-pi support, running in simulation mode \
             (SPI{} CE{} reset GPIO {} ignored)",
            cli.spi_bus, cli.chip_select, cli.reset_pin
        ));
        RadioHandle::simulated()
    };

    radio
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_warn(&format!("Failed to listen for Ctrl-C: {e}"));
        std::future::pending::<()>().await;
    }
    log_info("Shutdown requested");
}
