use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static INTERCEPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:frida|intercept)_",
        r"(onenter|onleave|both|cmodule|compiled_module|complex)",
        r"(?:_(v8|qjs|quickjs))?$",
    ))
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    OnEnter,
    OnLeave,
    Both,
    CompiledModule,
    Complex,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::OnEnter,
        Phase::OnLeave,
        Phase::Both,
        Phase::CompiledModule,
        Phase::Complex,
    ];

    /// Phases that run a script callback and therefore exist once per engine
    pub const SCRIPTED: [Phase; 3] = [Phase::OnEnter, Phase::OnLeave, Phase::Both];

    fn token(&self) -> &'static str {
        match self {
            Phase::OnEnter => "onenter",
            Phase::OnLeave => "onleave",
            Phase::Both => "both",
            Phase::CompiledModule => "cmodule",
            Phase::Complex => "complex",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::OnEnter => "onEnter",
            Phase::OnLeave => "onLeave",
            Phase::Both => "both",
            Phase::CompiledModule => "CModule",
            Phase::Complex => "complex",
        }
    }
}

/// Script engine backing an interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    V8,
    QuickJs,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::V8, Engine::QuickJs];

    fn token(&self) -> &'static str {
        match self {
            Engine::V8 => "v8",
            Engine::QuickJs => "qjs",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Engine::V8 => "V8",
            Engine::QuickJs => "QuickJS",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Engine::V8 => "V8",
            Engine::QuickJs => "QJS",
        }
    }
}

/// Which baseline a function is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionFamily {
    Simple,
    Complex,
}

impl FunctionFamily {
    pub fn of(function: &str) -> Self {
        if function.contains("complex") {
            FunctionFamily::Complex
        } else {
            FunctionFamily::Simple
        }
    }

    pub fn baseline(&self) -> MethodTag {
        match self {
            FunctionFamily::Simple => MethodTag::Baseline,
            FunctionFamily::Complex => MethodTag::BaselineComplex,
        }
    }

    /// Every method a report for this family may contain, in report order
    pub fn enumeration(&self) -> Vec<MethodTag> {
        let mut methods = vec![self.baseline(), MethodTag::LdPreload];
        for phase in Phase::ALL {
            methods.push(MethodTag::Intercept {
                phase,
                engine: None,
            });
            for engine in Engine::ALL {
                methods.push(MethodTag::Intercept {
                    phase,
                    engine: Some(engine),
                });
            }
        }
        methods
    }
}

/// A measurement method, parsed once from the `Method` column.
///
/// The derived ordering is the report order: baselines, `LD_PRELOAD`, then
/// interceptors by phase and engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MethodTag {
    Baseline,
    BaselineComplex,
    LdPreload,
    Intercept {
        phase: Phase,
        engine: Option<Engine>,
    },
}

impl MethodTag {
    pub fn is_baseline(&self) -> bool {
        matches!(self, MethodTag::Baseline | MethodTag::BaselineComplex)
    }

    pub fn engine(&self) -> Option<Engine> {
        match self {
            MethodTag::Intercept { engine, .. } => *engine,
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            MethodTag::Baseline => "Baseline".to_owned(),
            MethodTag::BaselineComplex => "Baseline (complex)".to_owned(),
            MethodTag::LdPreload => "LD_PRELOAD".to_owned(),
            MethodTag::Intercept {
                phase,
                engine: Some(engine),
            } => format!("Frida {} ({})", phase.label(), engine.name()),
            MethodTag::Intercept {
                phase,
                engine: None,
            } => format!("Frida {}", phase.label()),
        }
    }

    /// Label used when every bar shares the same instrumentation framework
    pub fn short_label(&self) -> String {
        match self {
            MethodTag::Intercept {
                phase,
                engine: Some(engine),
            } => format!("{} ({})", phase.label(), engine.short_name()),
            MethodTag::Intercept {
                phase,
                engine: None,
            } => phase.label().to_owned(),
            other => other.label(),
        }
    }
}

impl FromStr for MethodTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "baseline" => return Ok(MethodTag::Baseline),
            "baseline_complex" => return Ok(MethodTag::BaselineComplex),
            "ldpreload" | "ld_preload" => return Ok(MethodTag::LdPreload),
            _ => {}
        }

        let caps = INTERCEPT_RE
            .captures(&s)
            .ok_or_else(|| ConfigError::UnknownMethod(s.clone()))?;
        let phase = match &caps[1] {
            "onenter" => Phase::OnEnter,
            "onleave" => Phase::OnLeave,
            "both" => Phase::Both,
            "cmodule" | "compiled_module" => Phase::CompiledModule,
            _ => Phase::Complex,
        };
        let engine = caps.get(2).map(|m| match m.as_str() {
            "v8" => Engine::V8,
            _ => Engine::QuickJs,
        });
        Ok(MethodTag::Intercept { phase, engine })
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodTag::Baseline => write!(f, "baseline"),
            MethodTag::BaselineComplex => write!(f, "baseline_complex"),
            MethodTag::LdPreload => write!(f, "ldpreload"),
            MethodTag::Intercept {
                phase,
                engine: Some(engine),
            } => write!(f, "frida_{}_{}", phase.token(), engine.token()),
            MethodTag::Intercept {
                phase,
                engine: None,
            } => write!(f, "frida_{}", phase.token()),
        }
    }
}

impl TryFrom<String> for MethodTag {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MethodTag> for String {
    fn from(value: MethodTag) -> Self {
        value.to_string()
    }
}
