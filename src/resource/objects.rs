//! Configuration objects
//!
//! Typed subtypes of [`Resource`]. A modeled field is only populated when
//! the server value has the expected type; anything else, including `null`
//! and unmodeled keys, is kept verbatim in `extra`, so every object read
//! from the server survives a round trip.

use super::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Move `key` out of `map` if its value is non-null and decodes as `T`
fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key).filter(|v| !v.is_null())?;
    let typed = T::deserialize(value).ok()?;
    map.remove(key);
    Some(typed)
}

/// Defines a configuration object: `id`, `name` and `folder`, the listed
/// typed fields, the `extra` bucket, and the shared trait impls
macro_rules! config_object {
    (
        $(#[$meta:meta])*
        $ty:ident => $endpoint:literal {
            $( $(#[$fmeta:meta])* $field:ident: $fty:ty => $key:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct $ty {
            #[serde(skip_serializing_if = "Option::is_none")]
            pub id: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub folder: Option<String>,
            $(
                $(#[$fmeta])*
                #[serde(rename = $key, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$fty>,
            )*
            /// Unmodeled keys, and modeled keys that were null or of another type
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let mut extra = Map::<String, Value>::deserialize(deserializer)?;
                Ok(Self {
                    id: take_typed(&mut extra, "id"),
                    name: take_typed(&mut extra, "name"),
                    folder: take_typed(&mut extra, "folder"),
                    $( $field: take_typed(&mut extra, $key), )*
                    extra,
                })
            }
        }

        impl Resource for $ty {
            const ENDPOINT: &'static str = $endpoint;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn set_id(&mut self, id: Option<String>) {
                self.id = id;
            }

            fn name(&self) -> Option<&str> {
                self.name.as_deref()
            }

            fn folder(&self) -> Option<&str> {
                self.folder.as_deref()
            }
        }

        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    name: Some(name.into()),
                    ..Default::default()
                }
            }

            pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
                self.folder = Some(folder.into());
                self
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let attributes = self.attributes().map_err(|_| std::fmt::Error)?;
                write!(f, "{}", Value::Object(attributes))
            }
        }
    };
}

config_object! {
    /// Address object (IP netmask, range, wildcard or FQDN)
    Address => "/sse/config/v1/addresses" {
        description: String => "description",
        ip_netmask: String => "ip_netmask",
        ip_range: String => "ip_range",
        ip_wildcard: String => "ip_wildcard",
        fqdn: String => "fqdn",
        tag: Vec<String> => "tag",
    }
}

impl Address {
    pub fn ip_netmask(mut self, value: impl Into<String>) -> Self {
        self.ip_netmask = Some(value.into());
        self
    }

    pub fn fqdn(mut self, value: impl Into<String>) -> Self {
        self.fqdn = Some(value.into());
        self
    }
}

/// Dynamic membership filter of an address group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicFilter {
    pub filter: String,
}

config_object! {
    /// Address group, either a static member list or a tag filter
    AddressGroup => "/sse/config/v1/address-groups" {
        description: String => "description",
        static_members: Vec<String> => "static",
        dynamic: DynamicFilter => "dynamic",
        tag: Vec<String> => "tag",
    }
}

config_object! {
    Tag => "/sse/config/v1/tags" {
        color: String => "color",
        comments: String => "comments",
    }
}

config_object! {
    /// Service (TCP or UDP port definition)
    Service => "/sse/config/v1/services" {
        description: String => "description",
        /// `{"tcp": {"port": "443"}}` or `{"udp": {...}}`
        protocol: Value => "protocol",
        tag: Vec<String> => "tag",
    }
}

config_object! {
    ServiceGroup => "/sse/config/v1/service-groups" {
        members: Vec<String> => "members",
        tag: Vec<String> => "tag",
    }
}
