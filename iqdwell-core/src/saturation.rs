use std::num::NonZeroUsize;

/// Буферы длиннее этого порога сканируются параллельно.
pub const PARALLEL_SCAN_THRESHOLD: usize = 1 << 18;

/// Представимый диапазон выборок устройства.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub min: i16,
    pub max: i16,
}

impl SampleRange {
    /// SC16 Q11: 12-битные выборки в 16-битном контейнере
    pub const SC16_Q11: Self = Self {
        min: -2048,
        max: 2047,
    };

    /// Значение касается границы (или выходит за неё).
    pub fn is_extreme(
        &self,
        v: i16,
    ) -> bool {
        v <= self.min || v >= self.max
    }
}

impl Default for SampleRange {
    fn default() -> Self {
        Self::SC16_Q11
    }
}

/// Детектор насыщения АЦП по только что принятому буферу.
///
/// Сканирует буфер целиком: одна обрезанная выборка уже означает потерю
/// информации.
#[derive(Debug, Clone)]
pub struct SaturationDetector {
    range: SampleRange,
    threads: usize,
}

impl SaturationDetector {
    pub fn new(range: SampleRange) -> Self {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self { range, threads }
    }

    /// Ограничивает число потоков сканирования (1 = последовательно).
    pub fn with_threads(
        mut self,
        threads: usize,
    ) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn range(&self) -> SampleRange {
        self.range
    }

    /// Минимум и максимум буфера; `None` для пустого.
    pub fn min_max(
        &self,
        samples: &[i16],
    ) -> Option<(i16, i16)> {
        if self.threads > 1 && samples.len() >= PARALLEL_SCAN_THRESHOLD {
            min_max_parallel(samples, self.threads)
        } else {
            min_max_seq(samples)
        }
    }

    /// `true`, если минимум или максимум достигает границы диапазона.
    pub fn is_saturated(
        &self,
        samples: &[i16],
    ) -> bool {
        match self.min_max(samples) {
            Some((lo, hi)) => self.range.is_extreme(lo) || self.range.is_extreme(hi),
            None => false,
        }
    }
}

impl Default for SaturationDetector {
    fn default() -> Self {
        Self::new(SampleRange::SC16_Q11)
    }
}

fn min_max_seq(samples: &[i16]) -> Option<(i16, i16)> {
    let (&first, rest) = samples.split_first()?;
    Some(
        rest.iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

fn min_max_parallel(
    samples: &[i16],
    threads: usize,
) -> Option<(i16, i16)> {
    let chunk = samples.len().div_ceil(threads);

    std::thread::scope(|s| {
        let handles: Vec<_> = samples
            .chunks(chunk)
            .map(|part| s.spawn(move || min_max_seq(part)))
            .collect();

        handles
            .into_iter()
            .filter_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .reduce(|(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside(len: usize) -> Vec<i16> {
        // Пилообразный сигнал строго внутри (-2048, 2047)
        (0..len).map(|i| (i % 4093) as i16 - 2046).collect()
    }

    #[test]
    fn test_strictly_inside_not_saturated() {
        let det = SaturationDetector::default();
        let buf = inside(10_000);

        assert_eq!(det.min_max(&buf), Some((-2046, 2046)));
        assert!(!det.is_saturated(&buf));
    }

    #[test]
    fn test_max_anywhere_saturates() {
        let det = SaturationDetector::default().with_threads(1);
        let base = inside(1_000);

        for pos in [0, 1, 499, 998, 999] {
            let mut buf = base.clone();
            buf[pos] = SampleRange::SC16_Q11.max;
            assert!(det.is_saturated(&buf), "SAMP_MAX на позиции {pos}");
        }
    }

    #[test]
    fn test_min_anywhere_saturates() {
        let det = SaturationDetector::default().with_threads(1);
        let base = inside(1_000);

        for pos in [0, 500, 999] {
            let mut buf = base.clone();
            buf[pos] = SampleRange::SC16_Q11.min;
            assert!(det.is_saturated(&buf), "SAMP_MIN на позиции {pos}");
        }
    }

    #[test]
    fn test_out_of_range_counts_as_saturated() {
        let det = SaturationDetector::default();
        assert!(det.is_saturated(&[0, 3000, 0]));
        assert!(det.is_saturated(&[0, i16::MIN, 0]));
    }

    #[test]
    fn test_empty_and_zero_buffers() {
        let det = SaturationDetector::default();
        assert_eq!(det.min_max(&[]), None);
        assert!(!det.is_saturated(&[]));
        assert!(!det.is_saturated(&vec![0i16; 4_096]));
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let len = PARALLEL_SCAN_THRESHOLD * 3 + 17;
        let mut buf = inside(len);
        let par = SaturationDetector::default().with_threads(4);
        let seq = SaturationDetector::default().with_threads(1);

        assert_eq!(par.min_max(&buf), seq.min_max(&buf));
        assert!(!par.is_saturated(&buf));

        // Клиппинг в последнем (неполном) чанке
        buf[len - 1] = 2047;
        assert!(par.is_saturated(&buf));
        assert_eq!(par.min_max(&buf), seq.min_max(&buf));
    }

    #[test]
    fn test_custom_range() {
        let det = SaturationDetector::new(SampleRange { min: -128, max: 127 });
        assert_eq!(det.range(), SampleRange { min: -128, max: 127 });
        assert!(!det.is_saturated(&[-127, 126]));
        assert!(det.is_saturated(&[-128, 0]));
    }
}
