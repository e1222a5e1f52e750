use crate::device::{DeviceResult, RxDevice};

/// Шаг снижения усиления при насыщении (дБ).
pub const GAIN_STEP_DB: i32 = 1;

/// Обратная связь по усилению: каждый насыщенный dwell снижает усиление на
/// [`GAIN_STEP_DB`] перед следующим dwell.
///
/// Усиление только уменьшается. Вернуть его вверх можно лишь перезапуском
/// записи с новым начальным значением.
#[derive(Debug, Clone)]
pub struct GainController {
    gain_db: i32,
    pending_steps: u32,
    applied_steps: u32,
}

impl GainController {
    pub fn new(initial_gain_db: i32) -> Self {
        Self {
            gain_db: initial_gain_db,
            pending_steps: 0,
            applied_steps: 0,
        }
    }

    /// Текущее усиление (действует в следующем dwell, если нет ожидающих
    /// шагов).
    pub fn gain_db(&self) -> i32 {
        self.gain_db
    }

    /// Вердикт детектора по только что завершённому dwell.
    pub fn on_dwell_complete(
        &mut self,
        saturated: bool,
    ) {
        if saturated {
            self.pending_steps += 1;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_steps > 0
    }

    /// Сколько раз усиление было снижено за сессию.
    pub fn applied_steps(&self) -> u32 {
        self.applied_steps
    }

    /// Применяет ожидающее снижение одним вызовом `set_gain`.
    ///
    /// Возвращает новое усиление или `None`, если менять нечего. При отказе
    /// устройства состояние контроллера не меняется: усиление устройства
    /// неизвестно, и сессию нужно прервать.
    pub fn apply_pending<D: RxDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> DeviceResult<Option<i32>> {
        if self.pending_steps == 0 {
            return Ok(None);
        }

        let next = self
            .gain_db
            .saturating_sub(GAIN_STEP_DB.saturating_mul(self.pending_steps as i32));
        device.set_gain(next)?;

        self.gain_db = next;
        self.applied_steps += self.pending_steps;
        self.pending_steps = 0;

        Ok(Some(next))
    }
}
