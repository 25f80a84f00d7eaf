/*!

  The structured JSON netlist dialect.

  ```json
  {
    "module_name": "half_adder",
    "inputs": [{ "name": "a", "width": 1 }, { "name": "b", "width": 1 }],
    "outputs": [{ "name": "sum", "width": 1 }, { "name": "cout", "width": 1 }],
    "ic_instances": [{
      "instance_id": "U1",
      "part_number": "74HC86",
      "package": "DIP-14",
      "pin_assignments": { "1": "a", "2": "b", "3": "sum", "7": "GND", "14": "VCC" }
    }]
  }
  ```

  Records are read best effort: anything malformed below the top level is skipped.

*/

use crate::component::{PIN_COUNT, Pin};
use crate::error::{Error, Result};
use crate::netlist::{DEFAULT_PACKAGE, NetlistDesc};
use serde_json::Value;
use tracing::debug;

/// The module name used when the document does not carry one
pub const UNNAMED_MODULE: &str = "unnamed";

/// Port records wider than this are skipped
pub const MAX_PORT_WIDTH: u64 = 1024;

/// Parses a JSON netlist document
pub fn parse(bytes: &[u8]) -> Result<NetlistDesc> {
    let doc: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::Syntax(format!("netlist is not JSON: {e}")))?;

    let module_name = doc
        .get("module_name")
        .and_then(Value::as_str)
        .unwrap_or(UNNAMED_MODULE);
    let mut desc = NetlistDesc::new(module_name.to_string());

    declare_ports(&mut desc, doc.get("inputs"), true);
    declare_ports(&mut desc, doc.get("outputs"), false);

    if let Some(records) = doc.get("ic_instances").and_then(Value::as_array) {
        for record in records {
            add_instance(&mut desc, record);
        }
    }

    Ok(desc)
}

fn declare_ports(desc: &mut NetlistDesc, ports: Option<&Value>, is_input: bool) {
    let Some(ports) = ports.and_then(Value::as_array) else {
        return;
    };
    for port in ports {
        let Some(name) = port.get("name").and_then(Value::as_str) else {
            debug!("Skipping port record without a name: {port}");
            continue;
        };
        let width = port.get("width").and_then(Value::as_u64).unwrap_or(1);
        if width > MAX_PORT_WIDTH {
            debug!("Skipping port {name}: width {width} exceeds {MAX_PORT_WIDTH}");
            continue;
        }
        if width > 1 {
            for i in 0..width {
                desc.declare_signal(&format!("{name}_{i}"), is_input, !is_input);
            }
        } else {
            desc.declare_signal(name, is_input, !is_input);
        }
    }
}

fn add_instance(desc: &mut NetlistDesc, record: &Value) {
    let id = record.get("instance_id").and_then(Value::as_str);
    let part = record.get("part_number").and_then(Value::as_str);
    let (Some(id), Some(part)) = (id, part) else {
        debug!("Skipping instance record without an id or part number: {record}");
        return;
    };
    let package = record
        .get("package")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PACKAGE);
    desc.add_instance(id, part, package);

    let Some(pins) = record.get("pin_assignments").and_then(Value::as_object) else {
        return;
    };
    for (key, signal) in pins {
        let Some(pin) = parse_pin(key) else {
            debug!("Skipping {id} pin {key:?}: not a pin of a DIP-14 package");
            continue;
        };
        let Some(signal) = signal.as_str() else {
            debug!("Skipping {id} pin {pin}: signal is not a string");
            continue;
        };
        desc.connect(id, pin, signal);
    }
}

/// Parses a pin number in `1..=14`
pub(crate) fn parse_pin(s: &str) -> Option<Pin> {
    s.trim()
        .parse::<Pin>()
        .ok()
        .filter(|p| (1..=PIN_COUNT).contains(p))
}
