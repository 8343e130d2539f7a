use dotenv::dotenv;
use std::path::{Path, PathBuf};

/// The file whose presence marks a model as fully downloaded.
pub const CHECKPOINT_FILENAME: &str = "checkpoint_best.pt";

pub const MODELS_DIR_ENV_VAR: &str = "QGEN_MODELS_DIR";

const DEFAULT_MODELS_DIR: &str = "models";

/// The pretrained question generation models this crate knows how to
/// download and run. Each name doubles as the directory name under the
/// models dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QgenModel {
    Squad,
    AdversarialQa,
    SquadPlusAdversarialQa,
}

impl QgenModel {
    pub fn all() -> [QgenModel; 3] {
        [
            Self::Squad,
            Self::AdversarialQa,
            Self::SquadPlusAdversarialQa,
        ]
    }

    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Squad => "generator_qa_squad",
            Self::AdversarialQa => "generator_qa_adversarialqa",
            Self::SquadPlusAdversarialQa => "generator_qa_squad_plus_adversarialqa",
        }
    }

    pub fn archive_filename(&self) -> String {
        format!("{}.tgz", self.cli_name())
    }

    pub fn archive_url(&self) -> &'static str {
        match self {
            Self::Squad => "https://dl.fbaipublicfiles.com/dynabench/qa/qgen_squad.tgz",
            Self::AdversarialQa => "https://dl.fbaipublicfiles.com/dynabench/qa/qgen_dcombined.tgz",
            Self::SquadPlusAdversarialQa => {
                "https://dl.fbaipublicfiles.com/dynabench/qa/qgen_dcombined_plus_squad_10k.tgz"
            }
        }
    }

    pub fn from_cli_name(name: &str) -> Option<QgenModel> {
        Self::all().into_iter().find(|m| m.cli_name() == name)
    }

    /// Resolves a CLI model name, listing the available options on failure.
    pub fn resolve(name: &str) -> crate::Result<QgenModel> {
        Self::from_cli_name(name).ok_or_else(|| {
            crate::anyhow!(
                "Model ({}) is not available. The available options are: {}",
                name,
                Self::all().map(|m| m.cli_name()).join("|")
            )
        })
    }

    pub fn model_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.cli_name())
    }

    pub fn checkpoint_path(&self, base_dir: &Path) -> PathBuf {
        self.model_dir(base_dir).join(CHECKPOINT_FILENAME)
    }

    pub fn is_downloaded(&self, base_dir: &Path) -> bool {
        self.checkpoint_path(base_dir).exists()
    }
}

/// Base directory the models live under. `QGEN_MODELS_DIR` overrides the
/// `./models` default.
pub fn models_dir() -> PathBuf {
    dotenv().ok(); // Load .env file
    if let Ok(dir) = dotenv::var(MODELS_DIR_ENV_VAR) {
        PathBuf::from(dir)
    } else {
        PathBuf::from(DEFAULT_MODELS_DIR)
    }
}
