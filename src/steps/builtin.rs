//! steps::builtin
//!
//! Schema contracts for the step types shipped with the crate.
//!
//! | tag | output |
//! |-----|--------|
//! | `row_generator` | configured fields, inputs ignored |
//! | `dummy` | merged input |
//! | `mapping_input` | merged input, optionally checked/narrowed to declared fields |
//! | `mapping_output` | merged input |
//! | `stream_lookup` | main input plus looked-up value fields |
//! | `select_values` | selected, renamed and removed fields |
//! | `add_constants` | merged input plus constant fields |

use serde::Deserialize;

use super::traits::{StepContext, StepContractError, StepInput, StepSchemaContract};
use crate::core::schema::{FieldDescriptor, Schema, SchemaError, ValueType};

pub const ROW_GENERATOR: &str = "row_generator";
pub const DUMMY: &str = "dummy";
pub const MAPPING_INPUT: &str = "mapping_input";
pub const MAPPING_OUTPUT: &str = "mapping_output";
pub const STREAM_LOOKUP: &str = "stream_lookup";
pub const SELECT_VALUES: &str = "select_values";
pub const ADD_CONSTANTS: &str = "add_constants";

/// A field declared in step configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
}

impl FieldSpec {
    fn descriptor(&self) -> FieldDescriptor {
        let mut field = FieldDescriptor::new(&self.name, self.value_type);
        field.set_length(self.length);
        field.set_precision(self.precision);
        field
    }
}

fn contract_error(err: SchemaError) -> StepContractError {
    match err {
        SchemaError::DuplicateFieldName(name) => StepContractError::DuplicateField(name),
        SchemaError::FieldNotFound(name) => StepContractError::MissingField(name),
        SchemaError::UnknownValueType(t) => {
            StepContractError::InvalidConfig(format!("unknown value type '{t}'"))
        }
    }
}

fn require<'s>(schema: &'s Schema, name: &str) -> Result<&'s FieldDescriptor, StepContractError> {
    schema
        .find(name)
        .ok_or_else(|| StepContractError::MissingField(name.to_string()))
}

/// `row_generator`: emits the configured fields.
#[derive(Debug, Default)]
pub struct RowGenerator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RowGeneratorConfig {
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

impl StepSchemaContract for RowGenerator {
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        _input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        let config: RowGeneratorConfig = step.parse_config()?;
        Schema::from_fields(config.fields.iter().map(FieldSpec::descriptor))
            .map_err(contract_error)
    }
}

/// `dummy` and `mapping_output`: pass the merged input through.
#[derive(Debug, Default)]
pub struct PassThrough;

impl StepSchemaContract for PassThrough {
    fn output_schema(
        &self,
        _step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        Ok(input.merged.clone())
    }
}

/// `mapping_input`: entry point of an embedded graph.
///
/// Declared `fields` must be present in the injected input. With
/// `select_only = true` only the declared fields are kept, in declared order.
#[derive(Debug, Default)]
pub struct MappingInput;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MappingInputConfig {
    fields: Vec<FieldSpec>,
    select_only: bool,
}

impl StepSchemaContract for MappingInput {
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        let config: MappingInputConfig = step.parse_config()?;

        for spec in &config.fields {
            require(&input.merged, &spec.name)?;
        }

        if !config.select_only {
            return Ok(input.merged.clone());
        }

        Schema::from_fields(
            config
                .fields
                .iter()
                .filter_map(|spec| input.merged.find(&spec.name).cloned()),
        )
        .map_err(contract_error)
    }
}

/// `stream_lookup`: joins the main stream against an info stream.
///
/// The stream from `lookup_step` is the info stream; every other stream
/// is merged into the main input. Each `values` entry is appended to the
/// main input, typed from the info stream when the field exists there.
#[derive(Debug, Default)]
pub struct StreamLookup;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StreamLookupConfig {
    lookup_step: String,
    #[serde(default)]
    keys: Vec<LookupKey>,
    #[serde(default)]
    values: Vec<LookupValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LookupKey {
    stream: String,
    lookup: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LookupValue {
    name: String,
    rename: Option<String>,
    #[serde(rename = "type")]
    value_type: Option<ValueType>,
}

impl StepSchemaContract for StreamLookup {
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        let config: StreamLookupConfig = step.parse_config()?;

        let info = input.stream(&config.lookup_step).ok_or_else(|| {
            StepContractError::InvalidConfig(format!(
                "lookup step '{}' does not feed '{}'",
                config.lookup_step, step.name
            ))
        })?;

        let mut main = Schema::new();
        for stream in input
            .streams
            .iter()
            .filter(|s| !s.from.eq_ignore_ascii_case(&config.lookup_step))
        {
            for field in &stream.schema {
                if !main.contains(field.name()) {
                    main.push(field.clone()).map_err(contract_error)?;
                }
            }
        }

        for key in &config.keys {
            require(&main, &key.stream)?;
            require(&info.schema, &key.lookup)?;
        }

        for value in &config.values {
            let out_name = value.rename.as_deref().unwrap_or(&value.name);
            let field = match (info.schema.find(&value.name), value.value_type) {
                (Some(found), Some(t)) => {
                    let mut f = found.renamed(out_name);
                    f.set_value_type(t);
                    f
                }
                (Some(found), None) => found.renamed(out_name),
                (None, Some(t)) => FieldDescriptor::new(out_name, t),
                (None, None) => return Err(StepContractError::MissingField(value.name.clone())),
            };
            main.push(field).map_err(contract_error)?;
        }

        Ok(main)
    }
}

/// `select_values`: keep, order, rename and remove fields.
#[derive(Debug, Default)]
pub struct SelectValues;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SelectValuesConfig {
    select: Vec<SelectField>,
    remove: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectField {
    name: String,
    rename: Option<String>,
    length: Option<u32>,
    precision: Option<u32>,
}

impl StepSchemaContract for SelectValues {
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        let config: SelectValuesConfig = step.parse_config()?;

        let mut out = if config.select.is_empty() {
            input.merged.clone()
        } else {
            let mut selected = Schema::new();
            for sel in &config.select {
                let source = require(&input.merged, &sel.name)?;
                let mut field = source.renamed(sel.rename.as_deref().unwrap_or(&sel.name));
                if sel.length.is_some() {
                    field.set_length(sel.length);
                }
                if sel.precision.is_some() {
                    field.set_precision(sel.precision);
                }
                selected.push(field).map_err(contract_error)?;
            }
            selected
        };

        for name in &config.remove {
            out.remove(name).map_err(contract_error)?;
        }

        Ok(out)
    }
}

/// `add_constants`: append constant fields.
#[derive(Debug, Default)]
pub struct AddConstants;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddConstantsConfig {
    #[serde(default)]
    fields: Vec<ConstantField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantField {
    name: String,
    #[serde(rename = "type", default)]
    value_type: ValueType,
    length: Option<u32>,
    precision: Option<u32>,
    value: Option<toml::Value>,
}

impl ConstantField {
    /// Check that a literal value fits the declared type.
    fn check_value(&self) -> Result<(), StepContractError> {
        let Some(value) = &self.value else {
            return Ok(());
        };
        let fits = match self.value_type {
            ValueType::Integer => value.is_integer(),
            ValueType::Number | ValueType::BigNumber => value.is_integer() || value.is_float(),
            ValueType::Boolean => value.is_bool(),
            ValueType::String | ValueType::InetAddress => value.is_str(),
            ValueType::Date | ValueType::Timestamp => value.is_datetime() || value.is_str(),
            ValueType::None | ValueType::Serializable | ValueType::Binary => true,
        };
        if fits {
            Ok(())
        } else {
            Err(StepContractError::InvalidConfig(format!(
                "constant '{}' is not a valid {} value",
                self.name, self.value_type
            )))
        }
    }
}

impl StepSchemaContract for AddConstants {
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        let config: AddConstantsConfig = step.parse_config()?;
        let mut out = input.merged.clone();
        for constant in &config.fields {
            constant.check_value()?;
            let mut field = FieldDescriptor::new(&constant.name, constant.value_type);
            field.set_length(constant.length);
            field.set_precision(constant.precision);
            out.push(field).map_err(contract_error)?;
        }
        Ok(out)
    }
}
