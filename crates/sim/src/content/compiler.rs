use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use super::catalog::{Catalog, RecipeDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}

/// Compiles every `*.xml` file under `content_dir` into a catalog. Files are
/// read in sorted relative-path order; a def name may appear only once across
/// the whole directory.
pub fn load_catalog(content_dir: &Path) -> Result<Catalog, ContentError> {
    let xml_files = collect_xml_files_sorted(content_dir)
        .map_err(|error| read_error(error.path, error.source))?;
    let mut recipes = BTreeMap::<String, (RecipeDef, PathBuf)>::new();

    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source| read_error(xml_file.clone(), source))?;
        for recipe in parse_defs_document(xml_file, &raw)? {
            if let Some((_, first_file)) = recipes.get(&recipe.def_name) {
                return Err(ContentError {
                    code: ContentErrorCode::DuplicateDef,
                    message: format!(
                        "duplicate RecipeDef '{}' (first defined in {})",
                        recipe.def_name,
                        first_file.display()
                    ),
                    file_path: xml_file.clone(),
                    location: None,
                });
            }
            recipes.insert(recipe.def_name.clone(), (recipe, xml_file.clone()));
        }
    }

    let catalog = Catalog::from_recipes(recipes.into_values().map(|(recipe, _)| recipe).collect());
    info!(
        content_dir = %content_dir.display(),
        xml_file_count = xml_files.len(),
        recipe_count = catalog.recipes().len(),
        fingerprint = %catalog.fingerprint(),
        "content_catalog_loaded"
    );
    Ok(catalog)
}

fn parse_defs_document(file_path: &Path, raw: &str) -> Result<Vec<RecipeDef>, ContentError> {
    let doc = Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut defs = Vec::<RecipeDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "RecipeDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; expected <RecipeDef>",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        defs.push(parse_recipe_def(file_path, &doc, child)?);
    }
    Ok(defs)
}

fn parse_recipe_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<RecipeDef, ContentError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut base_time_ms: Option<u64> = None;
    let mut batch_size: Option<u32> = None;
    let mut input_cost: Option<i64> = None;
    let mut unit_value: Option<i64> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <RecipeDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "defName" => def_name = Some(required_text(file_path, doc, field, "defName")?),
            "label" => label = Some(required_text(file_path, doc, field, "label")?),
            "baseTimeMs" => {
                let value: u64 = parse_number(file_path, doc, field, "baseTimeMs")?;
                if value == 0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "baseTimeMs must be > 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                base_time_ms = Some(value);
            }
            "batchSize" => batch_size = Some(parse_number(file_path, doc, field, "batchSize")?),
            "inputCost" => {
                let value: i64 = parse_number(file_path, doc, field, "inputCost")?;
                if value < 0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "inputCost must be >= 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                input_cost = Some(value);
            }
            "unitValue" => {
                let value: i64 = parse_number(file_path, doc, field, "unitValue")?;
                if value < 0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "unitValue must be >= 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                unit_value = Some(value);
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <RecipeDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let missing = |name: &str| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("missing required field <{name}> in <RecipeDef>"),
            file_path,
            doc,
            node,
        )
    };
    Ok(RecipeDef {
        def_name: def_name.ok_or_else(|| missing("defName"))?,
        label: label.ok_or_else(|| missing("label"))?,
        base_time_ms: base_time_ms.ok_or_else(|| missing("baseTimeMs"))?,
        batch_size: batch_size.ok_or_else(|| missing("batchSize"))?,
        input_cost: input_cost.unwrap_or(0),
        unit_value: unit_value.unwrap_or(0),
    })
}

fn parse_number<T: std::str::FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<T, ContentError> {
    let value = required_text(file_path, doc, node, field_name)?;
    value.parse::<T>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{field_name} '{value}' is not a valid number"),
            file_path,
            doc,
            node,
        )
    })
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentError {
    let pos = doc.text_pos_at(node.range().start);
    ContentError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            files.push((normalize_rel_path(rel), path.clone()));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentError {
    ContentError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        file_path: path,
        location: None,
    }
}
