//! Parsed iCalendar components and properties.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a BEGIN/END block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    /// VCALENDAR wrapper component.
    Calendar,
    /// VEVENT component.
    Event,
    /// VTODO component.
    Todo,
    /// VJOURNAL component.
    Journal,
    /// VFREEBUSY component.
    FreeBusy,
    /// VTIMEZONE component.
    Timezone,
    /// STANDARD observance inside a VTIMEZONE.
    Standard,
    /// DAYLIGHT observance inside a VTIMEZONE.
    Daylight,
    /// VALARM component.
    Alarm,
    /// Any other component name, kept verbatim (upper-cased).
    Other(String),
}

impl ComponentKind {
    /// Parses a component kind from a BEGIN/END value (case-insensitive).
    pub fn parse(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VJOURNAL" => Self::Journal,
            "VFREEBUSY" => Self::FreeBusy,
            "VTIMEZONE" => Self::Timezone,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            "VALARM" => Self::Alarm,
            _ => Self::Other(upper),
        }
    }

    /// Returns the iCalendar name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Timezone => "VTIMEZONE",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Alarm => "VALARM",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ComponentKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One content line: `NAME;PARAM=VALUE:value`.
///
/// The value is kept raw; text unescaping happens where a field is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name, upper-cased.
    pub name: String,
    /// Raw property value.
    pub value: String,
    /// Parameters keyed by upper-cased name.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Property {
    /// Creates a property without parameters.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder method to add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Returns a parameter value by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns the TZID parameter, if any.
    pub fn tzid(&self) -> Option<&str> {
        self.param("TZID")
    }
}

/// A BEGIN/END block with its properties and nested blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The component kind.
    pub kind: ComponentKind,
    /// Properties in order of appearance.
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Nested components in order of appearance.
    #[serde(default)]
    pub children: Vec<Component>,
}

impl Component {
    /// Creates an empty component of the given kind.
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first property with the given name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Returns the raw value of the first property with the given name.
    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.property(name).map(|p| p.value.as_str())
    }

    /// Returns all properties with the given name.
    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties.iter().filter(move |p| p.name == name)
    }

    /// Returns the direct children of the given kind.
    pub fn children_of<'a>(
        &'a self,
        kind: &'a ComponentKind,
    ) -> impl Iterator<Item = &'a Component> {
        self.children.iter().filter(move |c| &c.kind == kind)
    }

    /// Appends a property.
    pub fn push_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Sets a property, replacing every existing property with that name.
    pub fn set_property(&mut self, property: Property) {
        self.properties.retain(|p| p.name != property.name);
        self.properties.push(property);
    }

    /// Returns the UID, or an empty string if absent.
    pub fn uid(&self) -> &str {
        self.property_value("UID").unwrap_or_default()
    }
}
