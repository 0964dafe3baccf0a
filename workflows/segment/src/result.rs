//! 运行结果.

use crate::lessons::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Result<Profile, String>, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Lesson `{name}`:")?;
    let p = match p {
        Ok(p) => p,
        Err(e) => return write!(w, "{S4}Failed: {e}"),
    };
    for (stage, d) in p.stages() {
        writeln!(w, "{S4}{stage}: {} us", d.as_micros())?;
    }
    writeln!(w, "{S4}Total time: {} us", p.get_total_us())?;
    writeln!(w, "{S4}Layers at the end: {}", p.get_layers())?;
    match p.get_nuclei() {
        Some(n) => writeln!(w, "{S4}Nuclei: {n}")?,
        None => writeln!(w, "{S4}Nuclei: /")?,
    }
    write!(w, "{S4}Files written: {}", p.outputs().len())?;
    for path in p.outputs() {
        write!(w, "\n{S4}{S4}{}", path.display())?;
    }
    Ok(())
}

/// 所有示例的最终结果.
pub struct LessonResult {
    data: Vec<(&'static str, Result<Profile, String>)>,
}

impl LessonResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Result<Profile, String>)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 是否所有示例都运行成功.
    pub fn all_succeeded(&self) -> bool {
        self.data.iter().all(|(_, r)| r.is_ok())
    }

    /// 运行结果报告, 各示例之间以分隔线隔开.
    fn report(&self) -> io::Result<String> {
        let mut buf = Vec::with_capacity(512);
        utils::sep_to(&mut buf)?;
        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut buf)?;
            writeln!(buf)?;
            utils::sep_to(&mut buf)?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// 打印运行结果.
    pub fn analyze(&self) {
        match self.report() {
            Ok(report) => print!("{report}"),
            Err(e) => log::error!("cannot format lesson report: {e}"),
        }
    }
}
