use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Web frameworks with a dedicated endpoint parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// Spring MVC (Java annotations).
    Spring,
    /// Django (Python views and URL configuration).
    Django,
    /// Ruby on Rails (routes DSL).
    Rails,
    /// ASP.NET MVC / Core (C# attributes).
    DotNet,
}

impl Framework {
    pub const ALL: [Framework; 4] = [
        Framework::Spring,
        Framework::Django,
        Framework::Rails,
        Framework::DotNet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Django => "django",
            Self::Rails => "rails",
            Self::DotNet => "dotnet",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spring" | "spring-mvc" => Ok(Self::Spring),
            "django" => Ok(Self::Django),
            "rails" => Ok(Self::Rails),
            "dotnet" | "aspnet" | "asp.net" => Ok(Self::DotNet),
            other => Err(format!("unknown framework: {other}")),
        }
    }
}
