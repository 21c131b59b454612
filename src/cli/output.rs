//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::plugin::{PluginSensor, SensorContainer};
use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Kind of a registered sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Control,
    Fan,
    Temperature,
}

impl SensorKind {
    fn unit(&self) -> &'static str {
        match self {
            SensorKind::Control => "%",
            SensorKind::Fan => " RPM",
            SensorKind::Temperature => "°C",
        }
    }
}

/// One sensor reading for display
#[derive(Debug, Clone, Serialize)]
pub struct SensorEntry {
    pub id: String,
    pub name: String,
    pub kind: SensorKind,
    pub value: Option<f32>,
}

impl SensorEntry {
    fn from_sensor<S: PluginSensor + ?Sized>(sensor: &S, kind: SensorKind) -> Self {
        Self {
            id: sensor.id().to_string(),
            name: sensor.name().to_string(),
            kind,
            value: sensor.value(),
        }
    }

    fn value_text(&self) -> String {
        match self.value {
            Some(v) => format!("{:.0}{}", v, self.kind.unit()),
            None => "-".to_string(),
        }
    }
}

impl TableDisplay for SensorEntry {
    fn to_table(&self) -> String {
        format!("{:<28} {:<28} {}", self.id, self.name, self.value_text())
    }

    fn to_compact(&self) -> String {
        format!("{}={}", self.id, self.value_text())
    }
}

/// Every registered sensor, in registration order
#[derive(Debug, Clone, Serialize)]
pub struct SensorList {
    pub plugin: String,
    pub sensors: Vec<SensorEntry>,
}

impl SensorList {
    /// Read every sensor in a container
    pub fn from_container(plugin: &str, container: &SensorContainer) -> Self {
        let controls = container
            .control_sensors
            .iter()
            .map(|c| SensorEntry::from_sensor(&**c, SensorKind::Control));
        let fans = container
            .fan_sensors
            .iter()
            .map(|s| SensorEntry::from_sensor(&**s, SensorKind::Fan));
        let temps = container
            .temp_sensors
            .iter()
            .map(|s| SensorEntry::from_sensor(&**s, SensorKind::Temperature));

        Self {
            plugin: plugin.to_string(),
            sensors: controls.chain(fans).chain(temps).collect(),
        }
    }
}

impl TableDisplay for SensorList {
    fn to_table(&self) -> String {
        let mut output = format!("Plugin: {}\n", self.plugin);
        output.push_str(&format!("Sensors: {}\n\n", self.sensors.len()));

        for sensor in &self.sensors {
            output.push_str(&sensor.to_table());
            output.push('\n');
        }

        output
    }

    fn to_compact(&self) -> String {
        self.sensors
            .iter()
            .map(|s| s.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
