use color_eyre::eyre::{self, eyre};
use homie5::{HomieDomain, HomieID};
use once_cell::sync::Lazy;
use rand::{distr::Alphanumeric, Rng};
use simple_kv_store::KubernetesResource;
use std::{env, path::PathBuf, str::FromStr};

use crate::unwrap_or_exit::UnwrapOrExit;

pub static ENV_PREFIX: Lazy<String> = Lazy::new(|| "HCTIMER".to_string());

pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::default);

pub const CHANNEL_CAPACITY: usize = 65535;

fn env_name(name: &str) -> String {
    format!("{}_{}", *ENV_PREFIX, name)
}

#[derive(Default, Debug)]
pub struct Settings {
    pub homie: HomieSettings,
    pub app: AppSettings,
}

#[derive(Debug)]
pub struct AppSettings {
    /// Key of the add-on configuration document in the config store.
    pub addon_id: String,
    pub config_store: ConfigStoreConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            addon_id: string_setting("ADDON_ID", "timers"),
            config_store: generic_setting(
                "CONFIG_STORE",
                ConfigStoreConfig::File {
                    path: PathBuf::from("./timers.yaml"),
                },
            ),
        }
    }
}

#[derive(Debug)]
pub enum ConfigStoreConfig {
    File {
        path: PathBuf,
    },
    InMemory,
    Kubernetes {
        name: String,
        namespace: String,
        ressource_type: KubernetesResource,
    },
    Sqlite {
        path: String,
    },
}

impl TryFrom<String> for ConfigStoreConfig {
    type Error = eyre::Report;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ConfigStoreConfig {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(2, ':').collect();

        match parts[0].to_lowercase().as_str() {
            "inmemory" => Ok(ConfigStoreConfig::InMemory),
            "file" if parts.len() == 2 && !parts[1].is_empty() => Ok(ConfigStoreConfig::File {
                path: PathBuf::from(parts[1]),
            }),
            "sqlite" if parts.len() == 2 && !parts[1].is_empty() => Ok(ConfigStoreConfig::Sqlite {
                path: parts[1].to_string(),
            }),
            "kubernetes" if parts.len() == 2 => {
                let kube_parts: Vec<&str> = parts[1].splitn(3, ',').collect();
                if kube_parts.len() < 2 {
                    return Err(eyre!("Kubernetes config store needs a resource type and a name"));
                }
                let ressource_type = match kube_parts[0] {
                    "secret" => KubernetesResource::Secret,
                    "configmap" => KubernetesResource::ConfigMap,
                    other => {
                        return Err(eyre!(
                            "Unknown kubernetes resource type '{}'. Use 'secret' or 'configmap'",
                            other
                        ))
                    }
                };
                let name = kube_parts[1].to_string();
                let namespace = if kube_parts.len() == 3 {
                    kube_parts[2].to_string()
                } else {
                    "default".to_string() // Use "default" if namespace is missing
                };
                Ok(ConfigStoreConfig::Kubernetes {
                    name,
                    namespace,
                    ressource_type,
                })
            }
            _ => Err(eyre!(
                "Invalid config store '{}'. Use 'file:/path/timers.yaml', 'inmemory', 'sqlite:/path/to/filename.db' or 'kubernetes:secret|configmap,name[,namespace]'",
                s
            )),
        }
    }
}

#[derive(Debug)]
pub struct HomieSettings {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub homie_domain: HomieDomain,
    pub controller_id: HomieID,
    pub controller_name: String,
}

impl Default for HomieSettings {
    fn default() -> Self {
        let hostname = string_setting("HOMIE_HOST", "localhost");
        let port = number_setting("HOMIE_PORT", 1883u16);

        let username = string_setting("HOMIE_USERNAME", String::default());
        let password = string_setting("HOMIE_PASSWORD", String::default());
        let client_id = string_setting(
            "HOMIE_CLIENT_ID",
            format!(
                "hctimer-{}",
                rand::rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect::<String>()
            ),
        );
        let homie_domain = generic_setting("HOMIE_DOMAIN", HomieDomain::Default);
        let controller_id = generic_setting("HOMIE_CTRL_ID", HomieID::new_const("hc-homie5-timers"));
        let controller_name = string_setting("HOMIE_CTRL_NAME", "Homecontrol Timers");

        Self {
            hostname,
            port,
            username,
            password,
            client_id,
            homie_domain,
            controller_id,
            controller_name,
        }
    }
}

fn string_setting(name: &str, default: impl Into<String>) -> String {
    env::var(env_name(name)).ok().unwrap_or(default.into())
}

fn number_setting<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env::var(env_name(name))
        .ok()
        .map(|value| value.parse::<T>().unwrap_or_exit(format!("{} is not a valid number", env_name(name))))
        .unwrap_or(default)
}

fn generic_setting<T>(name: &str, default: T) -> T
where
    T: TryFrom<String>,
    T::Error: std::fmt::Display,
{
    env::var(env_name(name))
        .ok()
        .map(|value| {
            value
                .try_into()
                .unwrap_or_exit(format!("Invalid setting supplied for {}", env_name(name)))
        })
        .unwrap_or(default)
}
