use parquet::basic::Type as PhysicalType;
use parquet::basic::{Compression, ConvertedType, Repetition, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::{Row, RowAccessor};
use parquet::schema::types::{Type, TypePtr};
use std::fs::File;
use std::sync::Arc;

const SCHEMA_NAME: &str = "2dMatrix";
const ROW_FIELD: &str = "row";

fn open_reader(file_path: &str) -> anyhow::Result<SerializedFileReader<File>> {
    Ok(SerializedFileReader::new(File::open(file_path)?)?)
}

fn fields_of(reader: &SerializedFileReader<File>) -> Vec<TypePtr> {
    reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .to_vec()
}

fn projection(fields: Vec<TypePtr>) -> anyhow::Result<Type> {
    Ok(Type::group_type_builder(SCHEMA_NAME)
        .with_fields(fields)
        .build()?)
}

fn is_numeric(field: &Type) -> bool {
    field.is_primitive()
        && matches!(
            field.get_physical_type(),
            PhysicalType::FLOAT | PhysicalType::DOUBLE | PhysicalType::INT32 | PhysicalType::INT64
        )
}

fn numeric_value(row: &Row, j: usize, tt: PhysicalType) -> anyhow::Result<f64> {
    Ok(match tt {
        PhysicalType::DOUBLE => row.get_double(j)?,
        PhysicalType::FLOAT => row.get_float(j)? as f64,
        PhysicalType::INT32 => row.get_int(j)? as f64,
        PhysicalType::INT64 => row.get_long(j)? as f64,
        other => return Err(anyhow::anyhow!("not a numeric column type: {:?}", other)),
    })
}

/// Names of all fields in `file_path`, the row-name field included
pub fn peek_parquet_field_names(file_path: &str) -> anyhow::Result<Vec<Box<str>>> {
    let reader = open_reader(file_path)?;
    Ok(fields_of(&reader)
        .iter()
        .map(|f| f.name().into())
        .collect())
}

/// Row names (the string field at `row_name_index`, default 0),
/// decoding nothing else
pub fn peek_parquet_row_names(
    file_path: &str,
    row_name_index: Option<usize>,
) -> anyhow::Result<Vec<Box<str>>> {
    let row_name_index = row_name_index.unwrap_or(0);
    let reader = open_reader(file_path)?;
    let fields = fields_of(&reader);

    let row_field = fields
        .get(row_name_index)
        .cloned()
        .ok_or(anyhow::anyhow!("no field {} in {}", row_name_index, file_path))?;

    let nrows = reader.metadata().file_metadata().num_rows() as usize;
    let mut row_names = Vec::with_capacity(nrows);
    for record in reader.get_row_iter(Some(projection(vec![row_field])?))? {
        row_names.push(record?.get_string(0)?.as_str().into());
    }
    Ok(row_names)
}

/// Numeric columns read from a parquet file, stored row by row
pub struct ParquetMatrix {
    pub row_major_data: Vec<f64>,
    pub row_names: Vec<Box<str>>,
    pub column_names: Vec<Box<str>>,
}

///
/// Read the row names and a set of numeric columns. Only the
/// selected columns are decoded.
///
/// * `row_name_index` - field holding row names (default 0)
/// * `column_indices` - fields to keep by position
/// * `column_names` - fields to keep by name
///
/// Fields named by either selector are kept, in file order; with
/// neither, every numeric field is.
///
pub fn read_parquet_columns(
    file_path: &str,
    row_name_index: Option<usize>,
    column_indices: Option<&[usize]>,
    column_names: Option<&[Box<str>]>,
) -> anyhow::Result<ParquetMatrix> {
    let row_name_index = row_name_index.unwrap_or(0);
    let reader = open_reader(file_path)?;
    let fields = fields_of(&reader);

    let row_field = fields
        .get(row_name_index)
        .cloned()
        .ok_or(anyhow::anyhow!("no field {} in {}", row_name_index, file_path))?;

    let select_all = column_indices.is_none() && column_names.is_none();
    let wanted = |j: usize, f: &Type| {
        select_all
            || column_indices.is_some_and(|idx| idx.contains(&j))
            || column_names.is_some_and(|names| names.iter().any(|n| n.as_ref() == f.name()))
    };

    let selected: Vec<TypePtr> = fields
        .iter()
        .enumerate()
        .filter(|&(j, f)| j != row_name_index && is_numeric(f) && wanted(j, f.as_ref()))
        .map(|(_, f)| f.clone())
        .collect();

    if selected.is_empty() {
        return Err(anyhow::anyhow!("no numeric columns selected in {}", file_path));
    }

    let column_names: Vec<Box<str>> = selected.iter().map(|f| f.name().into()).collect();
    let types: Vec<PhysicalType> = selected.iter().map(|f| f.get_physical_type()).collect();

    let mut projected = vec![row_field];
    projected.extend(selected);

    let nrows = reader.metadata().file_metadata().num_rows() as usize;
    let mut row_names = Vec::with_capacity(nrows);
    let mut row_major_data = Vec::with_capacity(nrows * types.len());

    for record in reader.get_row_iter(Some(projection(projected)?))? {
        let row = record?;
        row_names.push(row.get_string(0)?.as_str().into());
        for (k, &tt) in types.iter().enumerate() {
            row_major_data.push(numeric_value(&row, k + 1, tt)?);
        }
    }

    Ok(ParquetMatrix {
        row_major_data,
        row_names,
        column_names,
    })
}

fn matrix_schema(column_names: &[Box<str>]) -> anyhow::Result<Arc<Type>> {
    let mut fields = Vec::with_capacity(column_names.len() + 1);
    fields.push(Arc::new(
        Type::primitive_type_builder(ROW_FIELD, PhysicalType::BYTE_ARRAY)
            .with_repetition(Repetition::REQUIRED)
            .with_converted_type(ConvertedType::UTF8)
            .build()?,
    ));
    for name in column_names {
        fields.push(Arc::new(
            Type::primitive_type_builder(name, PhysicalType::DOUBLE)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
        ));
    }
    Ok(Arc::new(projection(fields)?))
}

///
/// Write a named matrix column by column in one row group: a UTF8
/// `row` field followed by one `DOUBLE` field per column, zstd
/// compressed
///
pub fn write_parquet_columns<I>(
    file_path: &str,
    row_names: &[Box<str>],
    column_names: &[Box<str>],
    columns: I,
) -> anyhow::Result<()>
where
    I: IntoIterator<Item = anyhow::Result<Vec<f64>>>,
{
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(5)?))
        .build();

    let mut writer = SerializedFileWriter::new(
        File::create(file_path)?,
        matrix_schema(column_names)?,
        Arc::new(props),
    )?;
    let mut group = writer.next_row_group()?;

    let names: Vec<ByteArray> = row_names
        .iter()
        .map(|r| ByteArray::from(r.as_ref()))
        .collect();
    let mut column = group
        .next_column()?
        .ok_or(anyhow::anyhow!("schema has no row-name field"))?;
    column
        .typed::<ByteArrayType>()
        .write_batch(&names, None, None)?;
    column.close()?;

    let mut written = 0;
    for values in columns {
        let values = values?;
        if values.len() != row_names.len() {
            return Err(anyhow::anyhow!(
                "column {} has {} values for {} rows",
                written,
                values.len(),
                row_names.len()
            ));
        }
        let mut column = group
            .next_column()?
            .ok_or(anyhow::anyhow!("more columns than the {} named", column_names.len()))?;
        column
            .typed::<DoubleType>()
            .write_batch(&values, None, None)?;
        column.close()?;
        written += 1;
    }

    if written != column_names.len() {
        return Err(anyhow::anyhow!(
            "wrote {} columns but named {}",
            written,
            column_names.len()
        ));
    }

    group.close()?;
    writer.close()?;
    Ok(())
}
