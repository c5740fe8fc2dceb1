// ============================================================================
// 配置 - 可视行数阈值 (screen lines count) 与惩罚权重
// ============================================================================
//
// 来源优先级: 命令行 > 配置文件 (YAML / Checkstyle XML) > 默认值。
// 配置错误在分析开始前返回给调用方，不会被静默替换成默认值。

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_yaml::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::ordering::PenaltyWeights;

pub const DEFAULT_SCREEN_LINES_COUNT: usize = 50;

/// YAML 中的阈值键
pub const YAML_SCREEN_LINES_KEY: &str = "screen-lines-count";

/// Checkstyle `<property name=..>` 中的阈值键
pub const XML_SCREEN_LINES_KEY: &str = "screenLinesCount";

/// Per-analysis settings, passed explicitly into every analysis call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Calls spanning more positions than this are "distant".
    pub screen_lines_count: usize,
    pub penalties: PenaltyWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            screen_lines_count: DEFAULT_SCREEN_LINES_COUNT,
            penalties: PenaltyWeights::default(),
        }
    }
}

impl AnalysisConfig {
    /// 按扩展名加载配置文件
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => Self::from_yaml(&content, path)?,
            "xml" => Self::from_checkstyle_xml(&content, path)?,
            other => return Err(ConfigError::UnknownFormat(other.to_string())),
        };
        debug!(path = %path.display(), screen_lines_count = config.screen_lines_count, "loaded config");
        Ok(config)
    }

    /// `screen-lines-count: 30` plus an optional `penalties:` table.
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let unreadable = |message: String| ConfigError::Unreadable {
            path: origin.to_path_buf(),
            message,
        };
        let document: Value = serde_yaml::from_str(content).map_err(|e| unreadable(e.to_string()))?;

        let raw = match document.get(YAML_SCREEN_LINES_KEY) {
            None | Some(Value::Null) => {
                return Err(ConfigError::Missing {
                    key: YAML_SCREEN_LINES_KEY.to_string(),
                })
            }
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        };
        let screen_lines_count = parse_screen_lines_count(YAML_SCREEN_LINES_KEY, &raw)?;

        let penalties = match document.get("penalties") {
            Some(table) => serde_yaml::from_value(table.clone()).map_err(|e| unreadable(e.to_string()))?,
            None => PenaltyWeights::default(),
        };

        Ok(Self {
            screen_lines_count,
            penalties,
        })
    }

    /// Reads `<property name="screenLinesCount" value=".."/>` from a Checkstyle configuration.
    pub fn from_checkstyle_xml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut value: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"property" => {
                    let mut name = None;
                    let mut raw_value = None;
                    for attr in e.attributes().flatten() {
                        let text = attr
                            .unescape_value()
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        match attr.key.as_ref() {
                            b"name" => name = Some(text),
                            b"value" => raw_value = Some(text),
                            _ => {}
                        }
                    }
                    if name.as_deref() == Some(XML_SCREEN_LINES_KEY) {
                        value = raw_value.or(Some(String::new()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ConfigError::Unreadable {
                        path: origin.to_path_buf(),
                        message: format!("XML parse error: {e}"),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        let raw = value.ok_or_else(|| ConfigError::Missing {
            key: XML_SCREEN_LINES_KEY.to_string(),
        })?;
        Ok(Self {
            screen_lines_count: parse_screen_lines_count(XML_SCREEN_LINES_KEY, &raw)?,
            penalties: PenaltyWeights::default(),
        })
    }

    /// Applies a command-line value on top of this configuration.
    pub fn with_screen_lines_override(mut self, raw: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = raw {
            self.screen_lines_count = parse_screen_lines_count("--screen-lines-count", raw)?;
        }
        Ok(self)
    }
}

/// 校验阈值: 必须是非负整数
pub fn parse_screen_lines_count(key: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse::<usize>().map_err(|_| ConfigError::NotNumeric {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
