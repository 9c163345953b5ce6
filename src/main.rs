//! Homeylink firmware: main entry point.
//!
//! Brings up WiFi, loads the engine configuration from NVS, binds the TCP
//! and UDP listeners and polls the protocol engine forever.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  BlockingWifi (STA)        EspNvs ("homey"/"config")    │
//! │                                                         │
//! │  StdTcpListener ─┐                    ┌─ MonotonicClock │
//! │  StdUdpSocket  ──┼──► Engine::tick ◄──┘                 │
//! │                  │        │                             │
//! │                  │   act / con / cap callbacks          │
//! └──────────────────┴────────┴─────────────────────────────┘
//! ```
//!
//! WiFi credentials are baked in at build time from `HOMEY_WIFI_SSID` and
//! `HOMEY_WIFI_PASS`.
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use homeylink::adapters::net::{StdTcpListener, StdUdpSocket};
use homeylink::adapters::time::MonotonicClock;
use homeylink::{Engine, EngineConfig, Response};

const WIFI_SSID: &str = match option_env!("HOMEY_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};
const WIFI_PASS: &str = match option_env!("HOMEY_WIFI_PASS") {
    Some(pass) => pass,
    None => "",
};

const NVS_NAMESPACE: &str = "homey";
const NVS_CONFIG_KEY: &str = "config";

/// Idle time between ticks when nothing was served.
const TICK_IDLE: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Homeylink v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match EspNvs::new(nvs_partition.clone(), NVS_NAMESPACE, true) {
        Ok(nvs) => load_config(&nvs),
        Err(e) => {
            warn!("NVS open failed ({}), using defaults", e);
            EngineConfig::default()
        }
    };

    // ── 3. WiFi station ───────────────────────────────────────
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID
            .try_into()
            .map_err(|()| anyhow!("SSID longer than 32 bytes"))?,
        password: WIFI_PASS
            .try_into()
            .map_err(|()| anyhow!("password longer than 64 bytes"))?,
        auth_method: if WIFI_PASS.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    info!("WiFi up, address {}", ip.ip);

    // ── 4. Engine + endpoints ─────────────────────────────────
    let listener = StdTcpListener::bind(config.port).map_err(homeylink::Error::from)?;
    let socket = StdUdpSocket::bind(config.port).map_err(homeylink::Error::from)?;
    let mut engine: Engine<_, _, _> =
        Engine::new(config, listener, socket, MonotonicClock::new());

    let mut led_on = false;
    engine.on_action("led", move |call| {
        led_on = matches!(call.argument(), Some("1" | "true" | "on"));
        info!("led -> {}", led_on);
        Response::nothing()
    });
    engine.on_capability("onoff", |call| {
        let on = matches!(call.argument(), Some("true"));
        call.set_capability_value("onoff", on);
        Response::result(on)
    });
    engine.on_condition("uptime_over", |call| {
        let Some(secs) = call.argument().and_then(|a| a.parse::<u64>().ok()) else {
            return Response::error_with_code("expected seconds", 400);
        };
        let uptime = unsafe { esp_idf_svc::sys::esp_timer_get_time() } as u64 / 1_000_000;
        Response::result(uptime > secs)
    });

    engine
        .begin("homeylink", homeylink::config::DEVICE_TYPE_HOMEYDUINO)
        .map_err(homeylink::Error::from)?;

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        let report = engine.tick();
        if report.tcp.is_none() && report.udp.is_none() {
            std::thread::sleep(TICK_IDLE);
        }
    }
}

fn load_config(nvs: &EspNvs<NvsDefault>) -> EngineConfig {
    let mut buf = [0u8; 64];
    let loaded = match nvs.get_raw(NVS_CONFIG_KEY, &mut buf) {
        Ok(Some(blob)) => EngineConfig::from_bytes(blob),
        Ok(None) => {
            info!("No stored config, using defaults");
            return EngineConfig::default();
        }
        Err(e) => {
            warn!("NVS config read failed ({}), using defaults", e);
            return EngineConfig::default();
        }
    };
    loaded.unwrap_or_else(|e| {
        warn!("Stored config rejected ({}), using defaults", e);
        EngineConfig::default()
    })
}
