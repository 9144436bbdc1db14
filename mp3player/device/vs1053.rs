//! Driver for the VLSI VS1053 MP3 decoder.
//!
//! The chip has two SPI interfaces sharing one bus: SCI (control registers,
//! selected by XCS) and SDI (audio data, selected by XDCS). DREQ goes high
//! while the chip can take at least 32 more bytes of data or a register
//! command.

use super::{step_down, step_up, DecoderDevice, DecoderLink, DEFAULT_VOLUME, MAX_VOLUME};
use crate::config::PinConfig;
use crate::error::DeviceError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;

pub const SCI_MODE: u8 = 0x00;
pub const SCI_STATUS: u8 = 0x01;
pub const SCI_CLOCKF: u8 = 0x03;
pub const SCI_DECODE_TIME: u8 = 0x04;
pub const SCI_AUDATA: u8 = 0x05;
pub const SCI_WRAM: u8 = 0x06;
pub const SCI_WRAMADDR: u8 = 0x07;
pub const SCI_VOL: u8 = 0x0B;

pub const SM_RESET: u16 = 0x0004;
pub const SM_CANCEL: u16 = 0x0008;
pub const SM_SDINEW: u16 = 0x0800;

const PARAM_END_FILL_BYTE: u16 = 0x1E06;
const VS1053_VERSION: u8 = 4;
const CLOCKF_3_5X: u16 = 0x6000;
const AUDATA_44K1_STEREO: u16 = 0xAC45;
const ATTENUATION_MUTE: u16 = 0xFE;
const HALF_DB_PER_STEP: u16 = 3;

/// Bytes the chip accepts per DREQ.
pub const SDI_CHUNK: usize = 32;
const END_FILL_LEN: usize = 2052;
const CANCEL_CHUNKS: usize = 2048 / SDI_CHUNK;
const DREQ_ATTEMPTS: u32 = 200;
const DREQ_POLL: Duration = Duration::from_millis(1);

/// Raw access to the chip. Implemented by the board support code on top of
/// its SPI bus and GPIO pins.
#[async_trait]
pub trait Vs1053Bus: Send + 'static {
    async fn sci_write(&mut self, register: u8, value: u16) -> Result<(), DeviceError>;

    async fn sci_read(&mut self, register: u8) -> Result<u16, DeviceError>;

    /// SDI data write with XDCS asserted, at most [`SDI_CHUNK`] bytes.
    async fn sdi_write(&mut self, data: &[u8]) -> Result<(), DeviceError>;

    fn dreq(&mut self) -> bool;
}

pub struct Vs1053<B> {
    bus: B,
    pins: PinConfig,
    volume: u8,
    end_fill_byte: u8,
    playing: bool,
}

impl<B: Vs1053Bus> Vs1053<B> {
    /// Resets the chip, verifies it is a VS1053 and applies the clock,
    /// sample rate and volume settings.
    pub async fn attach(bus: B, pins: PinConfig, volume: u8) -> Result<Self, DeviceError> {
        let mut chip = Self {
            bus,
            pins,
            volume: volume.min(MAX_VOLUME),
            end_fill_byte: 0,
            playing: false,
        };

        chip.wait_dreq().await?;
        chip.soft_reset().await?;

        let status = chip.bus.sci_read(SCI_STATUS).await?;
        let version = ((status >> 4) & 0x0F) as u8;
        if version != VS1053_VERSION {
            return Err(DeviceError::UnsupportedChip(version));
        }

        chip.bus.sci_write(SCI_CLOCKF, CLOCKF_3_5X).await?;
        chip.wait_dreq().await?;
        chip.bus.sci_write(SCI_AUDATA, AUDATA_44K1_STEREO).await?;
        chip.end_fill_byte = (chip.read_wram(PARAM_END_FILL_BYTE).await? & 0xFF) as u8;
        chip.apply_volume().await?;

        info!(
            "VS1053 attached (XCS={}, XDCS={}, DREQ={}), end fill byte {:#04x}",
            pins.cs, pins.dcs, pins.dreq, chip.end_fill_byte
        );
        Ok(chip)
    }

    pub fn pins(&self) -> PinConfig {
        self.pins
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    async fn wait_dreq(&mut self) -> Result<(), DeviceError> {
        for _ in 0..DREQ_ATTEMPTS {
            if self.bus.dreq() {
                return Ok(());
            }
            tokio::time::sleep(DREQ_POLL).await;
        }
        Err(DeviceError::NotReady)
    }

    async fn soft_reset(&mut self) -> Result<(), DeviceError> {
        self.bus.sci_write(SCI_MODE, SM_SDINEW | SM_RESET).await?;
        self.wait_dreq().await
    }

    async fn read_wram(&mut self, address: u16) -> Result<u16, DeviceError> {
        self.bus.sci_write(SCI_WRAMADDR, address).await?;
        self.bus.sci_read(SCI_WRAM).await
    }

    async fn apply_volume(&mut self) -> Result<(), DeviceError> {
        let attenuation = attenuation(self.volume);
        self.bus
            .sci_write(SCI_VOL, (attenuation << 8) | attenuation)
            .await
    }

    async fn write_data(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        for chunk in data.chunks(SDI_CHUNK) {
            self.wait_dreq().await?;
            self.bus.sdi_write(chunk).await?;
        }
        Ok(())
    }

    async fn send_end_fill(&mut self, len: usize) -> Result<(), DeviceError> {
        let fill = [self.end_fill_byte; SDI_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(SDI_CHUNK);
            self.write_data(&fill[..n]).await?;
            remaining -= n;
        }
        Ok(())
    }
}

/// SCI_VOL attenuation for one channel, in 0.5 dB steps. Level 0 mutes.
fn attenuation(level: u8) -> u16 {
    if level == 0 {
        ATTENUATION_MUTE
    } else {
        u16::from(MAX_VOLUME - level.min(MAX_VOLUME)) * HALF_DB_PER_STEP
    }
}

#[async_trait]
impl<B: Vs1053Bus> DecoderDevice for Vs1053<B> {
    async fn start_playing(&mut self) -> Result<(), DeviceError> {
        // Decode time has to be written twice to stick.
        self.bus.sci_write(SCI_DECODE_TIME, 0).await?;
        self.bus.sci_write(SCI_DECODE_TIME, 0).await?;
        self.playing = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        if !self.playing {
            return Ok(());
        }
        self.playing = false;

        self.send_end_fill(END_FILL_LEN).await?;
        let mode = self.bus.sci_read(SCI_MODE).await?;
        self.bus.sci_write(SCI_MODE, mode | SM_CANCEL).await?;

        for _ in 0..CANCEL_CHUNKS {
            self.send_end_fill(SDI_CHUNK).await?;
            if self.bus.sci_read(SCI_MODE).await? & SM_CANCEL == 0 {
                debug!("VS1053 stream cancelled");
                return Ok(());
            }
        }

        warn!("VS1053 ignored cancel, resetting");
        self.soft_reset().await?;
        self.bus.sci_write(SCI_CLOCKF, CLOCKF_3_5X).await?;
        self.apply_volume().await
    }

    async fn volume_up(&mut self) -> Result<u8, DeviceError> {
        let level = step_up(self.volume);
        if level != self.volume {
            self.volume = level;
            self.apply_volume().await?;
        }
        Ok(self.volume)
    }

    async fn volume_down(&mut self) -> Result<u8, DeviceError> {
        let level = step_down(self.volume);
        if level != self.volume {
            self.volume = level;
            self.apply_volume().await?;
        }
        Ok(self.volume)
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn is_ready_for_data(&mut self) -> bool {
        self.bus.dreq()
    }

    async fn feed(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        self.write_data(data).await
    }
}

pub struct Vs1053Link<B> {
    bus: B,
    volume: u8,
}

impl<B: Vs1053Bus> Vs1053Link<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            volume: DEFAULT_VOLUME,
        }
    }

    #[must_use]
    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }
}

#[async_trait]
impl<B: Vs1053Bus> DecoderLink for Vs1053Link<B> {
    type Device = Vs1053<B>;

    async fn attach(self, pins: PinConfig) -> Result<Self::Device, DeviceError> {
        Vs1053::attach(self.bus, pins, self.volume).await
    }
}
