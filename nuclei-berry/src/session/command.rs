//! 具名命令与快捷键绑定.
//!
//! 命令在注册时校验 (名称非空且唯一), 快捷键只能绑定到已注册的命令.
//! 命令逐个同步执行, 执行期间独占会话, 彼此之间不会交错.

use super::Session;
use crate::{BerryError, BerryResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 命令函数: 读写会话中的图层.
pub type CommandFn = Box<dyn Fn(&mut Session) -> BerryResult<()>>;

/// 快捷键组合, 例如 `Shift-P`, `Control-Alt-S`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct KeyCombo {
    control: bool,
    shift: bool,
    alt: bool,
    meta: bool,
    key: String,
}

/// 快捷键字符串解析失败.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyParseError {
    /// 空字符串或缺少主键 (例如 `Shift-`).
    MissingKey,

    /// 未知修饰键.
    UnknownModifier(String),

    /// 同一修饰键出现了多次.
    DuplicateModifier(String),
}

impl Display for KeyParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey => f.write_str("missing key"),
            Self::UnknownModifier(m) => write!(f, "unknown modifier `{m}`"),
            Self::DuplicateModifier(m) => write!(f, "modifier `{m}` given twice"),
        }
    }
}

impl std::error::Error for KeyParseError {}

impl KeyCombo {
    /// 解析 `修饰键-...-主键` 形式的字符串. 修饰键不区分大小写,
    /// 支持 `Shift`, `Control` (`Ctrl`), `Alt` (`Option`), `Meta` (`Cmd`, `Super`).
    /// 单字符主键统一为大写.
    pub fn parse(s: &str) -> Result<Self, KeyParseError> {
        let mut parts: Vec<&str> = s.split('-').collect();
        let key = match parts.pop() {
            Some(k) if !k.trim().is_empty() => k.trim(),
            _ => return Err(KeyParseError::MissingKey),
        };

        let mut ans = Self {
            key: if key.chars().count() == 1 {
                key.to_uppercase()
            } else {
                key.to_owned()
            },
            ..Default::default()
        };
        for m in parts {
            let flag = match m.trim().to_ascii_lowercase().as_str() {
                "shift" => &mut ans.shift,
                "control" | "ctrl" => &mut ans.control,
                "alt" | "option" => &mut ans.alt,
                "meta" | "cmd" | "super" => &mut ans.meta,
                _ => return Err(KeyParseError::UnknownModifier(m.to_owned())),
            };
            if *flag {
                return Err(KeyParseError::DuplicateModifier(m.to_owned()));
            }
            *flag = true;
        }
        Ok(ans)
    }

    /// 主键.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FromStr for KeyCombo {
    type Err = KeyParseError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 规范形式: 修饰键顺序固定为 `Control-Shift-Alt-Meta`.
impl Display for KeyCombo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (on, name) in [
            (self.control, "Control"),
            (self.shift, "Shift"),
            (self.alt, "Alt"),
            (self.meta, "Meta"),
        ] {
            if on {
                write!(f, "{name}-")?;
            }
        }
        f.write_str(&self.key)
    }
}

/// 命令注册表.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandFn>,
    keys: HashMap<KeyCombo, String>,
}

impl CommandRegistry {
    /// 空注册表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令. 名称为空或已被占用时返回错误.
    pub fn register<F>(&mut self, name: &str, command: F) -> BerryResult<()>
    where
        F: Fn(&mut Session) -> BerryResult<()> + 'static,
    {
        if name.trim().is_empty() {
            return Err(BerryError::EmptyCommandName);
        }
        if self.commands.contains_key(name) {
            return Err(BerryError::DuplicateCommand(name.to_owned()));
        }
        self.commands.insert(name.to_owned(), Box::new(command));
        log::debug!("command `{name}` registered");
        Ok(())
    }

    /// 将快捷键绑定到已注册的命令. 返回解析后的快捷键.
    pub fn bind_key(&mut self, key: &str, name: &str) -> BerryResult<KeyCombo> {
        let combo = KeyCombo::parse(key)?;
        if !self.commands.contains_key(name) {
            return Err(BerryError::UnknownCommand(name.to_owned()));
        }
        if let Some(bound) = self.keys.get(&combo) {
            return Err(BerryError::KeyAlreadyBound(combo.to_string(), bound.clone()));
        }
        self.keys.insert(combo.clone(), name.to_owned());
        Ok(combo)
    }

    /// 按名称执行命令.
    pub fn invoke(&self, name: &str, session: &mut Session) -> BerryResult<()> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| BerryError::UnknownCommand(name.to_owned()))?;
        log::info!("running command `{name}`");
        command(session)
    }

    /// 模拟按键. 快捷键未绑定时什么也不做并返回 `Ok(false)`.
    pub fn press(&self, key: &str, session: &mut Session) -> BerryResult<bool> {
        let combo = KeyCombo::parse(key)?;
        match self.command_for(&combo) {
            Some(name) => self.invoke(name, session).map(|_| true),
            None => Ok(false),
        }
    }

    /// 已注册的命令名, 按字典序.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// 快捷键对应的命令名.
    pub fn command_for(&self, key: &KeyCombo) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Image;

    #[test]
    fn test_key_parse() {
        let k = KeyCombo::parse("shift-p").unwrap();
        assert_eq!(k.to_string(), "Shift-P");
        assert_eq!(k, "Shift-P".parse().unwrap());
        assert_eq!(
            KeyCombo::parse("Alt-Ctrl-s").unwrap().to_string(),
            "Control-Alt-S"
        );
        assert_eq!(KeyCombo::parse("Enter").unwrap().key(), "Enter");

        assert_eq!(KeyCombo::parse(""), Err(KeyParseError::MissingKey));
        assert_eq!(KeyCombo::parse("Shift-"), Err(KeyParseError::MissingKey));
        assert!(matches!(
            KeyCombo::parse("Hyper-P"),
            Err(KeyParseError::UnknownModifier(_))
        ));
        assert!(matches!(
            KeyCombo::parse("Shift-shift-P"),
            Err(KeyParseError::DuplicateModifier(_))
        ));
    }

    #[test]
    fn test_registration_is_validated() {
        let mut registry = CommandRegistry::new();
        registry.register("noop", |_| Ok(())).unwrap();
        assert!(matches!(
            registry.register("noop", |_| Ok(())),
            Err(BerryError::DuplicateCommand(_))
        ));
        assert!(matches!(
            registry.register("  ", |_| Ok(())),
            Err(BerryError::EmptyCommandName)
        ));
        assert!(matches!(
            registry.bind_key("Shift-N", "missing"),
            Err(BerryError::UnknownCommand(_))
        ));
        registry.bind_key("Shift-N", "noop").unwrap();
        assert!(matches!(
            registry.bind_key("shift-n", "noop"),
            Err(BerryError::KeyAlreadyBound(..))
        ));
        assert!(matches!(
            registry.bind_key("Bogus-N", "noop"),
            Err(BerryError::KeyParse(_))
        ));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["noop"]);
        let bound = KeyCombo::parse("SHIFT-n").unwrap();
        assert_eq!(registry.command_for(&bound), Some("noop"));
        let free = KeyCombo::parse("Shift-M").unwrap();
        assert_eq!(registry.command_for(&free), None);
    }

    #[test]
    fn test_press_runs_command() {
        let mut registry = CommandRegistry::new();
        registry
            .register("add blank", |s| {
                s.add_image(Image::zeros((4, 4)), Some("blank")).map(|_| ())
            })
            .unwrap();
        registry.bind_key("Shift-B", "add blank").unwrap();

        let mut session = Session::new();
        assert!(!registry.press("Shift-X", &mut session).unwrap());
        assert!(registry.press("Shift-B", &mut session).unwrap());
        assert!(registry.press("Shift-B", &mut session).unwrap());
        assert_eq!(session.names(), vec!["blank", "blank [1]"]);
        assert!(matches!(
            registry.invoke("nothing", &mut session),
            Err(BerryError::UnknownCommand(_))
        ));
    }
}
