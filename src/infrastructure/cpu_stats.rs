use crate::domain::ports::CpuSampler;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Aggregate jiffy counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub iowait: u64,
    pub total: u64,
}

/// Parse the first (`cpu `) line of `/proc/stat`.
///
/// Fields: user nice system idle iowait irq softirq steal. Guest time is
/// already folded into user/nice by the kernel and is not summed again.
pub fn parse_cpu_line(line: &str) -> Option<CpuTimes> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }

    let values: Vec<u64> = fields
        .take(8)
        .map(|f| f.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    if values.len() < 5 {
        return None;
    }

    Some(CpuTimes {
        idle: values[3],
        iowait: values[4],
        total: values.iter().sum(),
    })
}

/// Idle share of the interval between two samples, in percent.
pub fn idle_percent(prev: CpuTimes, current: CpuTimes) -> f64 {
    let total = current.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let idle = (current.idle + current.iowait).saturating_sub(prev.idle + prev.iowait);
    100.0 * idle as f64 / total as f64
}

/// [`CpuSampler`] over `/proc/stat`.
///
/// The first sample only primes the baseline and reports `0.0`; read or
/// parse failures report `-1.0`.
pub struct ProcStatSampler {
    path: PathBuf,
    previous: Mutex<Option<CpuTimes>>,
}

impl ProcStatSampler {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            previous: Mutex::new(None),
        }
    }

    fn read_times(&self) -> Option<CpuTimes> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("ProcStatSampler: failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };
        let times = contents.lines().next().and_then(parse_cpu_line);
        if times.is_none() {
            warn!("ProcStatSampler: unexpected format in {}", self.path.display());
        }
        times
    }
}

impl Default for ProcStatSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler for ProcStatSampler {
    fn sample_idle_percent(&self) -> f64 {
        let Some(current) = self.read_times() else {
            return -1.0;
        };

        let mut previous = match self.previous.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match previous.replace(current) {
            Some(prev) => idle_percent(prev, current),
            None => 0.0,
        }
    }
}
