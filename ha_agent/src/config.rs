// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::net::Ipv4Addr;
use std::path::Path;

use ipnetwork::Ipv4Network;
use serde::Deserialize;

use crate::error::ConfigError;

const MIN_PORT: u16 = 1024;
const MIN_VRID: u8 = 1;

fn default_port() -> u16 {
    50051
}

fn default_consistency_check_interval_seconds() -> u32 {
    10
}

/// Corresponds to `global->aws` in the config file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    pub ec2_private_endpoint_url: Option<String>,
}

/// Corresponds to `global` in the config file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_consistency_check_interval_seconds")]
    pub consistency_check_interval_seconds: u32,
    #[serde(default)]
    pub aws: Option<AwsConfig>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            port: default_port(),
            consistency_check_interval_seconds: default_consistency_check_interval_seconds(),
            aws: None,
        }
    }
}

impl GlobalConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port < MIN_PORT {
            return Err(ConfigError::Parse(format!(
                "global.port must be between {MIN_PORT} and 65535, got {}",
                self.port
            )));
        }
        if self.consistency_check_interval_seconds < 1 {
            return Err(ConfigError::Parse(
                "global.consistency_check_interval_seconds must be a positive integer".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Corresponds to `groups->action` in the config file, discriminated by the `type` field.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionConfig {
    AwsActivateVip {
        device_index: u32,
        vip: Ipv4Addr,
    },
    AwsUpdateRouteTable {
        route_table_id: String,
        destination: Ipv4Network,
        target_network_interface: String,
    },
}

/// Corresponds to one entry of `groups` in the config file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub xr_interface: String,
    pub vrid: u8,
    pub action: ActionConfig,
}

impl GroupConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.vrid < MIN_VRID {
            return Err(ConfigError::Parse(format!(
                "groups[].vrid must be between 1 and 255, got {}",
                self.vrid
            )));
        }
        Ok(())
    }
}

/// Direct typed representation of the agent's config file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "global", default)]
    pub global: GlobalConfig,
    pub groups: Vec<GroupConfig>,
}

impl Config {
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.global.validate()?;
        for group in &config.groups {
            group.validate()?;
        }
        one_action_per_group(&config.groups)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Reading config from file: {}", path.display());
        let contents =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Read(err.to_string()))?;
        Self::from_str(&contents)
    }
}

fn one_action_per_group(groups: &[GroupConfig]) -> Result<(), ConfigError> {
    let keys: Vec<(&str, u8)> = groups.iter().map(|g| (g.xr_interface.as_str(), g.vrid)).collect();
    for (i, key) in keys.iter().enumerate() {
        if keys[..i].contains(key) {
            return Err(ConfigError::DuplicateGroup {
                xr_interface: key.0.to_owned(),
                vrid: key.1,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let yaml = r#"
groups:
  - xr_interface: Hun0/0/0/1
    vrid: 1
    action:
      type: aws_activate_vip
      device_index: 0
      vip: 10.0.2.100
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.global.port, 50051);
        assert_eq!(config.global.consistency_check_interval_seconds, 10);
        assert_eq!(config.groups.len(), 1);
        assert_eq!(
            config.groups[0].action,
            ActionConfig::AwsActivateVip {
                device_index: 0,
                vip: "10.0.2.100".parse().unwrap(),
            }
        );
    }

    #[test]
    fn parses_a_route_table_action_and_global_overrides() {
        let yaml = r#"
global:
  port: 60051
  consistency_check_interval_seconds: 5
  aws:
    ec2_private_endpoint_url: https://ec2.example.com
groups:
  - xr_interface: Hun0/0/0/2
    vrid: 2
    action:
      type: aws_update_route_table
      route_table_id: rtb-0123
      destination: 10.0.0.0/24
      target_network_interface: eni-0123
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.global.port, 60051);
        assert_eq!(
            config.global.aws.unwrap().ec2_private_endpoint_url,
            Some("https://ec2.example.com".to_owned())
        );
        assert_eq!(
            config.groups[0].action,
            ActionConfig::AwsUpdateRouteTable {
                route_table_id: "rtb-0123".to_owned(),
                destination: "10.0.0.0/24".parse().unwrap(),
                target_network_interface: "eni-0123".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = r#"
groups: []
unexpected: true
"#;
        assert!(matches!(Config::from_str(yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_duplicate_groups() {
        let yaml = r#"
groups:
  - xr_interface: Hun0/0/0/1
    vrid: 1
    action:
      type: aws_activate_vip
      device_index: 0
      vip: 10.0.2.100
  - xr_interface: Hun0/0/0/1
    vrid: 1
    action:
      type: aws_activate_vip
      device_index: 1
      vip: 10.0.2.101
"#;
        let err = Config::from_str(yaml).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateGroup {
                xr_interface: "Hun0/0/0/1".to_owned(),
                vrid: 1,
            }
        );
    }

    #[test]
    fn rejects_out_of_range_port() {
        let yaml = r#"
global:
  port: 80
groups: []
"#;
        assert!(matches!(Config::from_str(yaml), Err(ConfigError::Parse(_))));
    }
}
