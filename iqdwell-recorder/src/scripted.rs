//! Детерминированное устройство для тестов цикла захвата.
//!
//! Выдаёт заранее заданную последовательность результатов приёма, внедряет
//! отказы в нужные вызовы и записывает все вызовы для проверки.

use std::{
    collections::{HashMap, VecDeque},
    thread,
    time::Duration,
};

use iqdwell_types::LinkSpeed;

use crate::device::{
    DeviceError, DeviceInfo, DeviceResult, GainMode, RxDevice, RxMetadata, StreamConfig,
};

/// Вид операции устройства (для внедрения отказов).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    SetFrequency,
    SetSampleRate,
    SetBandwidth,
    SetGainMode,
    SetGain,
    ConfigureStream,
    EnableRx,
}

/// Записанный вызов.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetFrequency(u64),
    SetSampleRate(u32),
    SetBandwidth(u32),
    SetGainMode(GainMode),
    SetGain(i32),
    ConfigureStream(StreamConfig),
    EnableRx(bool),
    Receive { count: u32 },
    Close,
}

/// Содержимое буфера после приёма.
#[derive(Debug, Clone, Default)]
pub struct Fill {
    /// Значение всех выборок
    pub value: i16,
    /// Точечные значения `(индекс в буфере i16, значение)`
    pub spikes: Vec<(usize, i16)>,
}

/// Результат одного вызова `receive`.
#[derive(Debug, Clone)]
pub enum RxStep {
    Clean(Fill),
    Overrun { actual_count: u32, fill: Fill },
    Error(DeviceError),
}

impl RxStep {
    pub fn clean() -> Self {
        RxStep::Clean(Fill::default())
    }

    /// Чистый приём с одним значением `value` на позиции `index`.
    pub fn spike(
        index: usize,
        value: i16,
    ) -> Self {
        RxStep::Clean(Fill {
            value: 0,
            spikes: vec![(index, value)],
        })
    }

    pub fn overrun(actual_count: u32) -> Self {
        RxStep::Overrun {
            actual_count,
            fill: Fill::default(),
        }
    }

    pub fn error(
        status: i32,
        message: &str,
    ) -> Self {
        RxStep::Error(DeviceError::new(status, message))
    }
}

/// Скриптовое устройство.
#[derive(Debug)]
pub struct ScriptedDevice {
    info_link_speed: LinkSpeed,
    fpga_version: String,
    firmware_version: String,
    /// Фактическая частота дискретизации (`None` = как запрошено)
    actual_sample_rate: Option<u32>,
    /// Фактическая полоса (`None` = как запрошено)
    actual_bandwidth: Option<u32>,
    receive_delay: Duration,
    script: VecDeque<RxStep>,
    failures: Vec<(DeviceOp, usize, DeviceError)>,
    op_counts: HashMap<DeviceOp, usize>,
    calls: Vec<DeviceCall>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self {
            info_link_speed: LinkSpeed::Super,
            fpga_version: "0.15.3".to_string(),
            firmware_version: "2.4.0".to_string(),
            actual_sample_rate: None,
            actual_bandwidth: None,
            receive_delay: Duration::ZERO,
            script: VecDeque::new(),
            failures: Vec::new(),
            op_counts: HashMap::new(),
            calls: Vec::new(),
        }
    }

    /// Результаты приёма по порядку; после исчерпания — чистые приёмы нулей.
    pub fn with_script<I: IntoIterator<Item = RxStep>>(
        mut self,
        steps: I,
    ) -> Self {
        self.script.extend(steps);
        self
    }

    /// `n`-й (с нуля) вызов операции `op` завершится ошибкой `err`.
    pub fn fail_nth(
        mut self,
        op: DeviceOp,
        n: usize,
        err: DeviceError,
    ) -> Self {
        self.failures.push((op, n, err));
        self
    }

    /// Каждый приём блокируется на `delay` (длительность dwell).
    pub fn with_receive_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.receive_delay = delay;
        self
    }

    pub fn with_actual_rates(
        mut self,
        sample_rate: Option<u32>,
        bandwidth: Option<u32>,
    ) -> Self {
        self.actual_sample_rate = sample_rate;
        self.actual_bandwidth = bandwidth;
        self
    }

    pub fn with_identity(
        mut self,
        link_speed: LinkSpeed,
        fpga_version: &str,
        firmware_version: &str,
    ) -> Self {
        self.info_link_speed = link_speed;
        self.fpga_version = fpga_version.to_string();
        self.firmware_version = firmware_version.to_string();
        self
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Значения всех вызовов `set_gain` по порядку.
    pub fn gain_sets(&self) -> Vec<i32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::SetGain(g) => Some(*g),
                _ => None,
            })
            .collect()
    }

    pub fn receive_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::Receive { .. }))
            .count()
    }

    fn check(
        &mut self,
        op: DeviceOp,
    ) -> DeviceResult<()> {
        let n = self.op_counts.entry(op).or_insert(0);
        let index = *n;
        *n += 1;

        match self
            .failures
            .iter()
            .find(|(f_op, f_n, _)| *f_op == op && *f_n == index)
        {
            Some((_, _, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for ScriptedDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_fill(
    buf: &mut [i16],
    values: usize,
    fill: &Fill,
) {
    buf[..values].fill(fill.value);
    for &(index, value) in &fill.spikes {
        if let Some(slot) = buf.get_mut(index) {
            *slot = value;
        }
    }
}

impl RxDevice for ScriptedDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            board_name: "scripted".to_string(),
            serial: "SCRIPT-0001".to_string(),
            link_speed: self.info_link_speed,
            fpga_version: self.fpga_version.clone(),
            firmware_version: self.firmware_version.clone(),
        }
    }

    fn set_frequency(
        &mut self,
        hz: u64,
    ) -> DeviceResult<u64> {
        self.calls.push(DeviceCall::SetFrequency(hz));
        self.check(DeviceOp::SetFrequency)?;
        Ok(hz)
    }

    fn set_sample_rate(
        &mut self,
        sps: u32,
    ) -> DeviceResult<u32> {
        self.calls.push(DeviceCall::SetSampleRate(sps));
        self.check(DeviceOp::SetSampleRate)?;
        Ok(self.actual_sample_rate.unwrap_or(sps))
    }

    fn set_bandwidth(
        &mut self,
        hz: u32,
    ) -> DeviceResult<u32> {
        self.calls.push(DeviceCall::SetBandwidth(hz));
        self.check(DeviceOp::SetBandwidth)?;
        Ok(self.actual_bandwidth.unwrap_or(hz))
    }

    fn set_gain_mode(
        &mut self,
        mode: GainMode,
    ) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetGainMode(mode));
        self.check(DeviceOp::SetGainMode)
    }

    fn set_gain(
        &mut self,
        gain_db: i32,
    ) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetGain(gain_db));
        self.check(DeviceOp::SetGain)
    }

    fn configure_stream(
        &mut self,
        config: &StreamConfig,
    ) -> DeviceResult<()> {
        self.calls.push(DeviceCall::ConfigureStream(config.clone()));
        self.check(DeviceOp::ConfigureStream)
    }

    fn enable_rx(
        &mut self,
        enable: bool,
    ) -> DeviceResult<()> {
        self.calls.push(DeviceCall::EnableRx(enable));
        self.check(DeviceOp::EnableRx)
    }

    fn receive(
        &mut self,
        buf: &mut [i16],
        count: u32,
        _timeout: Duration,
    ) -> DeviceResult<RxMetadata> {
        self.calls.push(DeviceCall::Receive { count });

        if !self.receive_delay.is_zero() {
            thread::sleep(self.receive_delay);
        }

        let values = (count as usize * 2).min(buf.len());

        match self.script.pop_front().unwrap_or_else(RxStep::clean) {
            RxStep::Clean(fill) => {
                apply_fill(buf, values, &fill);
                Ok(RxMetadata {
                    actual_count: count,
                    overrun: false,
                })
            }
            RxStep::Overrun { actual_count, fill } => {
                let valid = (actual_count as usize * 2).min(values);
                apply_fill(buf, valid, &fill);
                Ok(RxMetadata {
                    actual_count,
                    overrun: true,
                })
            }
            RxStep::Error(err) => Err(err),
        }
    }

    fn close(&mut self) {
        self.calls.push(DeviceCall::Close);
    }
}
