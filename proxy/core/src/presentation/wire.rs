// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON wire messages.
//!
//! Shapes follow the `sparkproxy.v1` protobuf contract rendered with protojson
//! rules: lowerCamelCase names on output, snake_case accepted on input, enums by
//! value name (or number on input) and default-valued fields omitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::domain::application::{DriverSpec, ExecutorSpec};

/// An enum field as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Number(i32),
    Name(String),
}

impl std::fmt::Display for EnumValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

macro_rules! proto_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $number:literal => $wire:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            pub fn from_str_name(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($number => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn from_value(value: &EnumValue) -> Option<Self> {
                match value {
                    EnumValue::Number(n) => Self::from_i32(*n),
                    EnumValue::Name(name) => Self::from_str_name(name),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str_name())
            }
        }
    };
}

proto_enum! {
    SparkApplicationType {
        Unspecified = 0 => "SPARK_APPLICATION_TYPE_UNSPECIFIED",
        Python = 1 => "SPARK_APPLICATION_TYPE_PYTHON",
        Scala = 2 => "SPARK_APPLICATION_TYPE_SCALA",
        Java = 3 => "SPARK_APPLICATION_TYPE_JAVA",
        R = 4 => "SPARK_APPLICATION_TYPE_R",
    }
}

proto_enum! {
    DeployMode {
        Unspecified = 0 => "DEPLOY_MODE_UNSPECIFIED",
        Client = 1 => "DEPLOY_MODE_CLIENT",
        Cluster = 2 => "DEPLOY_MODE_CLUSTER",
    }
}

proto_enum! {
    SparkApplicationState {
        Unspecified = 0 => "SPARK_APPLICATION_STATE_UNSPECIFIED",
        Pending = 1 => "SPARK_APPLICATION_STATE_PENDING",
        Submitted = 2 => "SPARK_APPLICATION_STATE_SUBMITTED",
        Running = 3 => "SPARK_APPLICATION_STATE_RUNNING",
        Completed = 4 => "SPARK_APPLICATION_STATE_COMPLETED",
        Failed = 5 => "SPARK_APPLICATION_STATE_FAILED",
        Unknown = 6 => "SPARK_APPLICATION_STATE_UNKNOWN",
    }
}

/// Every field is optional at this layer; the translator decides what is required.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSparkApplicationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub app_type: Option<EnumValue>,
    pub mode: Option<EnumValue>,
    pub image: Option<String>,
    #[serde(alias = "main_application_file")]
    pub main_application_file: Option<String>,
    #[serde(alias = "main_class")]
    pub main_class: Option<String>,
    pub arguments: Option<Vec<String>>,
    pub driver: Option<DriverSpec>,
    pub executor: Option<ExecutorSpec>,
    pub deps: Option<Vec<String>>,
    #[serde(alias = "spark_conf")]
    pub spark_conf: Option<BTreeMap<String, String>>,
    #[serde(alias = "spark_version")]
    pub spark_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplication {
    pub id: String,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub app_type: SparkApplicationType,
    pub mode: DeployMode,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    pub main_application_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub main_class: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub spark_conf: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub spark_version: String,
    pub state: SparkApplicationState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListSparkApplicationsResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<SparkApplication>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Body of the explicit transition endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionStatusRequest {
    pub state: Option<EnumValue>,
    #[serde(alias = "expected_state")]
    pub expected_state: Option<EnumValue>,
    /// RFC 3339 timestamp.
    #[serde(alias = "observed_at")]
    pub observed_at: Option<String>,
}

/// Data of one watch stream frame. The SSE event name repeats `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ApplicationEventMessage {
    Created {
        namespace: String,
        name: String,
        id: String,
        created_at: DateTime<Utc>,
    },
    StateChanged {
        namespace: String,
        name: String,
        id: String,
        from: SparkApplicationState,
        to: SparkApplicationState,
        changed_at: DateTime<Utc>,
    },
    Deleted {
        namespace: String,
        name: String,
        id: String,
        deleted_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
