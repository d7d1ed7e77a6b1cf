//! Anti-detection data: masking directives and randomized identities.
//!
//! The profile host's bot detection changes without notice, so the concrete
//! flags and scripts are plain configuration data. Nothing in the session
//! code knows what an individual directive does.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One anti-detection measure applied to every new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskingDirective {
    /// Extra browser command-line flag.
    LaunchArg { value: String },
    /// Override a property getter, e.g. `navigator.webdriver`.
    /// A `null` value makes the getter return `undefined`.
    DefineProperty {
        target: String,
        property: String,
        value: serde_json::Value,
    },
    /// Remove a property from an object.
    DeleteProperty { target: String, property: String },
    /// Arbitrary script evaluated before any page script runs.
    Script { source: String },
}

impl MaskingDirective {
    pub fn launch_arg(&self) -> Option<&str> {
        match self {
            Self::LaunchArg { value } => Some(value),
            _ => None,
        }
    }

    /// JavaScript implementing this directive, if it is a runtime directive.
    pub fn to_script(&self) -> Option<String> {
        match self {
            Self::LaunchArg { .. } => None,
            Self::DefineProperty {
                target,
                property,
                value,
            } => {
                let getter = if value.is_null() {
                    "undefined".to_string()
                } else {
                    value.to_string()
                };
                Some(format!(
                    "try {{ Object.defineProperty({target}, '{property}', {{ get: () => {getter}, configurable: true }}); }} catch (e) {{}}"
                ))
            }
            Self::DeleteProperty { target, property } => Some(format!(
                "try {{ delete {target}['{property}']; }} catch (e) {{}}"
            )),
            Self::Script { source } => Some(source.clone()),
        }
    }
}

/// Launch flags contributed by a directive list.
pub fn launch_args(directives: &[MaskingDirective]) -> Vec<String> {
    directives
        .iter()
        .filter_map(|d| d.launch_arg().map(str::to_string))
        .collect()
}

/// Single script combining every runtime directive, in order.
pub fn masking_script(directives: &[MaskingDirective]) -> String {
    directives
        .iter()
        .filter_map(MaskingDirective::to_script)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Directives shipped by default.
pub fn default_masking_directives() -> Vec<MaskingDirective> {
    vec![
        MaskingDirective::LaunchArg {
            value: "--disable-blink-features=AutomationControlled".into(),
        },
        MaskingDirective::LaunchArg {
            value: "--disable-infobars".into(),
        },
        MaskingDirective::LaunchArg {
            value: "--lang=en-US".into(),
        },
        MaskingDirective::DefineProperty {
            target: "navigator".into(),
            property: "webdriver".into(),
            value: serde_json::Value::Null,
        },
        MaskingDirective::DefineProperty {
            target: "navigator".into(),
            property: "languages".into(),
            value: serde_json::json!(["en-US", "en"]),
        },
        MaskingDirective::DefineProperty {
            target: "navigator".into(),
            property: "plugins".into(),
            value: serde_json::json!([1, 2, 3, 4, 5]),
        },
        MaskingDirective::DeleteProperty {
            target: "window".into(),
            property: "cdc_adoQpoasnfa76pfcZLmcfl_Array".into(),
        },
        MaskingDirective::Script {
            source: "window.chrome = window.chrome || { runtime: {} };".into(),
        },
    ]
}

/// Browser window dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A browser identity: user agent plus the window sizes it may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_agent: String,
    pub viewports: Vec<Viewport>,
}

/// Identity and viewport picked for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    pub user_agent: String,
    pub viewport: Viewport,
}

impl Identity {
    /// Desktop identities shipped by default.
    pub fn default_pool() -> Vec<Identity> {
        let desktop = vec![
            Viewport {
                width: 1920,
                height: 1080,
            },
            Viewport {
                width: 1536,
                height: 864,
            },
            Viewport {
                width: 1440,
                height: 900,
            },
            Viewport {
                width: 1366,
                height: 768,
            },
        ];
        [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
        ]
        .iter()
        .map(|ua| Identity {
            user_agent: ua.to_string(),
            viewports: desktop.clone(),
        })
        .collect()
    }
}

/// Fallback used when the configured pool is empty.
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Draw a random identity and viewport from `pool`.
pub fn pick_identity<R: Rng + ?Sized>(pool: &[Identity], rng: &mut R) -> SessionIdentity {
    let default_viewport = Viewport {
        width: 1366,
        height: 768,
    };
    match pool.choose(rng) {
        Some(identity) => SessionIdentity {
            user_agent: identity.user_agent.clone(),
            viewport: identity
                .viewports
                .choose(rng)
                .copied()
                .unwrap_or(default_viewport),
        },
        None => SessionIdentity {
            user_agent: FALLBACK_USER_AGENT.to_string(),
            viewport: default_viewport,
        },
    }
}
