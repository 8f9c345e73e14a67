//! Tool parameters: the declarative schema a tool publishes, the bound values the
//! host hands back, and their normalization into typed values.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Direction, NATIVE_RASTER_FORMAT, ParameterType, RASTER_FORMATS};

/// Placeholder text for an unset non-numeric parameter.
pub const UNSET: &str = "#";

/// Default `result_table_name`, replaced with the run identifier during validation.
pub const RUN_ID_TOKEN: &str = "#run_id#";

/// Delimiter between the values of a multi-value parameter.
pub const MULTI_VALUE_DELIMITER: char = ';';

pub const RASTER_FORMAT: &str = "raster_format";
pub const OUTPUT_WORKSPACE: &str = "output_workspace";
pub const OUTPUT_PREFIX: &str = "output_filename_prefix";
pub const OUTPUT_SUFFIX: &str = "output_filename_suffix";
pub const RESULT_TABLE_NAME: &str = "result_table_name";
pub const RESULT_TABLE: &str = "result_table";
pub const FAIL_TABLE: &str = "fail_table";

/// Validation message attached to a parameter by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterMessage {
    Error(String),
}

/// A bound tool parameter as the host presents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub display_name: String,
    pub datatype: ParameterType,
    pub value: Option<String>,
    pub required: bool,
    pub multi_value: bool,
    /// Names of the parameters this one depends on
    pub dependencies: Vec<String>,
    /// True when the value came from the user rather than the schema default
    pub altered: bool,
    pub message: Option<ParameterMessage>,
}

impl Parameter {
    pub fn new(name: &str, datatype: ParameterType, value: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            datatype,
            value: value.map(str::to_string),
            required: false,
            multi_value: false,
            dependencies: Vec::new(),
            altered: value.is_some(),
            message: None,
        }
    }

    /// Text value, `None` when unset or empty.
    pub fn value_as_text(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.message = Some(ParameterMessage::Error(message.into()));
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn has_error(&self) -> bool {
        matches!(self.message, Some(ParameterMessage::Error(_)))
    }
}

/// Look up a parameter by name.
pub fn find_parameter<'a>(parameters: &'a [Parameter], name: &str) -> Option<&'a Parameter> {
    parameters.iter().find(|p| p.name == name)
}

/// Look up a parameter by name, failing with `ParameterNotFound`.
pub fn get_parameter<'a>(parameters: &'a [Parameter], name: &str) -> Result<&'a Parameter> {
    find_parameter(parameters, name).ok_or_else(|| Error::ParameterNotFound {
        name: name.to_string(),
    })
}

/// One entry of a tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub display_name: String,
    pub datatype: ParameterType,
    pub required: bool,
    pub direction: Direction,
    pub multi_value: bool,
    pub choices: Vec<String>,
    pub dependencies: Vec<String>,
    pub default: Option<String>,
    pub category: Option<String>,
}

impl ParameterSpec {
    /// A required input parameter.
    pub fn new(name: &str, display_name: &str, datatype: ParameterType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            datatype,
            required: true,
            direction: Direction::Input,
            multi_value: false,
            choices: Vec::new(),
            dependencies: Vec::new(),
            default: None,
            category: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn multi_value(mut self) -> Self {
        self.multi_value = true;
        self
    }

    pub fn derived(mut self) -> Self {
        self.direction = Direction::Derived;
        self.required = false;
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// Ordered parameter schema of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub specs: Vec<ParameterSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(mut self, spec: ParameterSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// A table view of `<data_type>` datasets (`<data_type>_table`) plus the field
    /// holding the dataset paths (`<data_type>`, defaulting to a column of that name).
    pub fn input_table_view(self, data_type: &str, display_name: &str) -> Self {
        let table = format!("{}_table", data_type);
        let field_label = format!("Field for {}", data_type);
        self.parameter(ParameterSpec::new(&table, display_name, ParameterType::TableView))
            .parameter(
                ParameterSpec::new(data_type, &field_label, ParameterType::Field)
                    .depends_on(&table)
                    .default_value(data_type),
            )
    }

    /// Raster format choice list, defaulting to the native format.
    pub fn raster_format(self, required: bool) -> Self {
        let spec = ParameterSpec::new(RASTER_FORMAT, "Output Raster Format", ParameterType::String)
            .choices(RASTER_FORMATS)
            .default_value(NATIVE_RASTER_FORMAT);
        self.parameter(if required { spec } else { spec.optional() })
    }

    /// Output workspace, result table name and the derived pass/fail tables; with
    /// `affixing`, also the output filename prefix and suffix.
    pub fn output_tables(self, affixing: bool) -> Self {
        let mut schema = self.parameter(ParameterSpec::new(
            OUTPUT_WORKSPACE,
            "Output Workspace",
            ParameterType::Workspace,
        ));
        if affixing {
            schema = schema
                .parameter(
                    ParameterSpec::new(OUTPUT_PREFIX, "Output Filename Prefix", ParameterType::String)
                        .optional(),
                )
                .parameter(
                    ParameterSpec::new(OUTPUT_SUFFIX, "Output Filename Suffix", ParameterType::String)
                        .optional(),
                );
        }
        schema
            .parameter(
                ParameterSpec::new(RESULT_TABLE_NAME, "Result Table Name", ParameterType::String)
                    .optional()
                    .default_value(RUN_ID_TOKEN),
            )
            .parameter(ParameterSpec::new(RESULT_TABLE, "Result Table", ParameterType::Table).derived())
            .parameter(ParameterSpec::new(FAIL_TABLE, "Fail Table", ParameterType::Table).derived())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// Bind user-supplied text values to the schema, in schema order. Names the
    /// schema does not declare are rejected.
    pub fn bind(&self, values: &IndexMap<String, String>) -> Result<Vec<Parameter>> {
        if let Some(unknown) = values.keys().find(|k| self.get(k).is_none()) {
            return Err(Error::ParameterNotFound {
                name: unknown.clone(),
            });
        }
        Ok(self
            .specs
            .iter()
            .map(|spec| {
                let supplied = values.get(&spec.name);
                Parameter {
                    name: spec.name.clone(),
                    display_name: spec.display_name.clone(),
                    datatype: spec.datatype,
                    value: supplied.cloned().or_else(|| spec.default.clone()),
                    required: spec.required,
                    multi_value: spec.multi_value,
                    dependencies: spec.dependencies.clone(),
                    altered: supplied.is_some(),
                    message: None,
                }
            })
            .collect())
    }
}

/// Check bound parameters before a run, attaching messages to offending ones.
/// Fills the `result_table_name` default with `run_id`. Returns the number of
/// parameters carrying an error.
pub fn validate_parameters(parameters: &mut [Parameter], schema: &Schema, run_id: &str) -> usize {
    for p in parameters.iter_mut() {
        p.clear_message();
        if p.name == RESULT_TABLE_NAME
            && matches!(p.value_as_text(), None | Some(RUN_ID_TOKEN) | Some(UNSET))
        {
            p.value = Some(run_id.to_string());
        }
    }

    let workspace = find_parameter(parameters, OUTPUT_WORKSPACE).and_then(|p| p.value.clone());
    let workspace_altered = find_parameter(parameters, OUTPUT_WORKSPACE).is_some_and(|p| p.altered);

    for p in parameters.iter_mut() {
        if p.required && p.datatype != ParameterType::Boolean && p.value_as_text().is_none() {
            p.set_error_message("Value is required");
            continue;
        }
        let choices = schema.get(&p.name).map(|s| s.choices.as_slice()).unwrap_or(&[]);
        if let Some(value) = p.value_as_text() {
            let outside = if p.multi_value {
                value
                    .split(MULTI_VALUE_DELIMITER)
                    .any(|v| !choices.is_empty() && !choices.iter().any(|c| c == v))
            } else {
                !choices.is_empty() && !choices.iter().any(|c| c == value)
            };
            if outside {
                p.set_error_message("Value is not a member of the list");
                continue;
            }
        }
        if p.name == RASTER_FORMAT && (p.altered || workspace_altered) {
            let fmt = p.value_as_text().unwrap_or(NATIVE_RASTER_FORMAT);
            if workspace.as_deref().is_some_and(is_local_gdb) && fmt != NATIVE_RASTER_FORMAT {
                p.set_error_message("Invalid raster format for workspace type");
            }
        }
    }

    let errors = parameters.iter().filter(|p| p.has_error()).count();
    debug!("Parameter validation found {} error(s)", errors);
    errors
}

/// A file geodatabase workspace (`*.gdb`) only holds rasters in the native format.
pub fn is_local_gdb(workspace: &str) -> bool {
    workspace
        .trim_end_matches(['/', '\\'])
        .to_ascii_lowercase()
        .ends_with(".gdb")
}

/// A normalized parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    /// `None` when the parameter was left empty
    Float(Option<f64>),
    /// `None` when the parameter was left empty
    Int(Option<i64>),
    Text(String),
    List(Vec<ParamValue>),
    /// Left as the bound parameter (the tool needs the object itself)
    Object(Parameter),
}

/// Parameter name to normalized value, in schema order. Every bound parameter
/// appears exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedParameters {
    values: IndexMap<String, ParamValue>,
}

fn coerce(name: &str, datatype: ParameterType, text: Option<&str>) -> Result<ParamValue> {
    let text = text.filter(|t| !t.is_empty());
    let fail = |value: &str| Error::ValueCoercion {
        name: name.to_string(),
        datatype,
        value: value.to_string(),
    };
    Ok(match datatype {
        ParameterType::Boolean => ParamValue::Bool(text == Some("true")),
        ParameterType::Double => match text {
            Some(t) => ParamValue::Float(Some(t.trim().parse::<f64>().map_err(|_| fail(t))?)),
            None => ParamValue::Float(None),
        },
        ParameterType::Long => match text {
            Some(t) => {
                let f = t.trim().parse::<f64>().map_err(|_| fail(t))?;
                if !f.is_finite() {
                    return Err(fail(t));
                }
                ParamValue::Int(Some(f.trunc() as i64))
            }
            None => ParamValue::Int(None),
        },
        _ => ParamValue::Text(text.unwrap_or(UNSET).to_string()),
    })
}

/// Normalize bound parameters into typed values.
///
/// Parameters named in `exclude` are passed through as objects. Non-numeric text
/// on a numeric parameter fails with [`Error::ValueCoercion`].
pub fn normalize(parameters: &[Parameter], exclude: &[&str]) -> Result<NormalizedParameters> {
    let mut values = IndexMap::with_capacity(parameters.len());
    for p in parameters {
        let value = if exclude.contains(&p.name.as_str()) {
            ParamValue::Object(p.clone())
        } else if p.multi_value && p.datatype != ParameterType::TableView {
            let items = p
                .value_as_text()
                .map(|v| {
                    v.split(MULTI_VALUE_DELIMITER)
                        .map(|item| coerce(&p.name, p.datatype, Some(item)))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();
            ParamValue::List(items)
        } else {
            coerce(&p.name, p.datatype, p.value.as_deref())?
        };
        values.insert(p.name.clone(), value);
    }

    if let Some(ParamValue::Text(fmt)) = values.get_mut(RASTER_FORMAT) {
        *fmt = raster_format_extension(fmt);
    }
    for affix in [OUTPUT_PREFIX, OUTPUT_SUFFIX] {
        if let Some(ParamValue::Text(v)) = values.get_mut(affix) {
            if v == UNSET {
                v.clear();
            }
        }
    }

    Ok(NormalizedParameters { values })
}

/// Output file extension for a raster format label: the native format has
/// none, everything else is the label behind a dot.
pub fn raster_format_extension(label: &str) -> String {
    if label == UNSET || label.is_empty() || label.eq_ignore_ascii_case(NATIVE_RASTER_FORMAT) {
        String::new()
    } else {
        format!(".{}", label)
    }
}

impl NormalizedParameters {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.values.get(name).ok_or_else(|| Error::ParameterNotFound {
            name: name.to_string(),
        })
    }

    fn mismatch(name: &str, expected: &'static str) -> Error {
        Error::ParameterType {
            name: name.to_string(),
            expected,
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Bool(b) => Ok(*b),
            _ => Err(Self::mismatch(name, "boolean")),
        }
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>> {
        match self.require(name)? {
            ParamValue::Float(f) => Ok(*f),
            ParamValue::Int(i) => Ok(i.map(|i| i as f64)),
            _ => Err(Self::mismatch(name, "float")),
        }
    }

    /// A float that must have been supplied.
    pub fn required_float(&self, name: &str) -> Result<f64> {
        self.float(name)?.ok_or_else(|| Error::InvalidParameters(format!("'{}' requires a value", name)))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        match self.require(name)? {
            ParamValue::Int(i) => Ok(*i),
            _ => Err(Self::mismatch(name, "integer")),
        }
    }

    /// Text value; unset parameters read as the `#` placeholder.
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ParamValue::Text(t) => Ok(t.as_str()),
            _ => Err(Self::mismatch(name, "text")),
        }
    }

    /// Text value with the placeholder and empty text mapped to `None`.
    pub fn optional_text(&self, name: &str) -> Result<Option<&str>> {
        let t = self.text(name)?;
        Ok(if t == UNSET || t.is_empty() { None } else { Some(t) })
    }

    pub fn list(&self, name: &str) -> Result<&[ParamValue]> {
        match self.require(name)? {
            ParamValue::List(items) => Ok(items.as_slice()),
            _ => Err(Self::mismatch(name, "list")),
        }
    }

    /// Integer items of a multi-value parameter, skipping empty entries.
    pub fn int_list(&self, name: &str) -> Result<Vec<i64>> {
        Ok(self
            .list(name)?
            .iter()
            .filter_map(|v| match v {
                ParamValue::Int(i) => *i,
                _ => None,
            })
            .collect())
    }

    pub fn object(&self, name: &str) -> Result<&Parameter> {
        match self.require(name)? {
            ParamValue::Object(p) => Ok(p),
            _ => Err(Self::mismatch(name, "parameter object")),
        }
    }
}

/// Typed tool configuration built from normalized parameters.
pub trait FromParameters: Sized + std::fmt::Debug {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self>;
}

impl FromParameters for NormalizedParameters {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        Ok(params.clone())
    }
}
