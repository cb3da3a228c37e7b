//! 运行结果.

use ice_berry::IceballPlan;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// 将 `plan` 的统计写进 `w` 中.
fn describe_into<W: Write>(plan: &IceballPlan, elapsed: Duration, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    let s = &plan.summary;
    let ratio = if s.evaluated == 0 {
        "/".to_string()
    } else {
        format!("{:.4}%", s.masked as f64 * 100.0 / s.evaluated as f64)
    };

    writeln!(w, "Plan with {} probes:", plan.probes.len())?;
    writeln!(w, "{S4}Urethra points: {}", plan.urethra.len())?;
    writeln!(w, "{S4}Probe limits: {:?}", plan.computed_limits.as_array())?;
    writeln!(w, "{S4}Scanned limits: {:?}", plan.scanned_limits.as_array())?;
    writeln!(w, "{S4}Evaluated voxels: {}", s.evaluated)?;
    writeln!(w, "{S4}Masked voxels: {} ({ratio})", s.masked)?;
    writeln!(w, "{S4}Max probability: {:.6}", s.max_probability)?;
    write!(w, "{S4}Plan time: {} ms", elapsed.as_millis())?;
    Ok(())
}

/// 最终结果.
pub struct IceballResult {
    plan: IceballPlan,
    elapsed: Duration,
    out_dir: PathBuf,
}

impl IceballResult {
    pub fn new(plan: IceballPlan, elapsed: Duration, out_dir: PathBuf) -> Self {
        Self {
            plan,
            elapsed,
            out_dir,
        }
    }

    fn report<W: Write>(&self, w: &mut W) -> io::Result<()> {
        utils::sep_to(&mut *w)?;
        describe_into(&self.plan, self.elapsed, w)?;
        writeln!(w)?;
        writeln!(w, "Output: {}", self.out_dir.display())?;
        utils::sep_to(w)
    }

    /// 打印运行结果.
    pub fn analyze(&self) {
        if let Err(e) = self.report(&mut io::stdout().lock()) {
            log::warn!("结果输出失败: {e}");
        }
    }
}
