//! # Leitura e Escrita de Modelos
//!
//! Formato binário versionado (inteiros big-endian, strings com prefixo `u16`):
//!
//! ```text
//! magic     "MXNT"
//! versão    u32 (1)
//! tipo      str  ("sentdetect", "tokenizer", "postag", "chunker", "namefind", "parser")
//! manifest  u32 + JSON
//! seções    u32, e para cada uma: nome (str), tamanho (u32), bytes
//! ```
//!
//! Seções maxent usam o layout GIS (ver [`read_gis`]); `tagdict`,
//! `abbreviations` e `dictionary` são JSON.
//!
//! Qualquer truncamento, contagem negativa, peso não finito ou tabela
//! inconsistente resulta em [`NlpError::CorruptModel`]. Contêineres
//! compactados (gzip, zlib, zip) não são lidos e falham com
//! [`NlpError::UnsupportedModelType`]. Cada carga monta um `Arc<Model>` novo, então uma
//! falha nunca afeta modelos carregados antes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::error::{NlpError, Result};
use crate::maxent::{Context, MaxentModel};
use crate::model::{EntityDictionary, Model, ModelKind, TagDictionary};

pub const MAGIC: &[u8; 4] = b"MXNT";
pub const FORMAT_VERSION: u32 = 1;

/// Tipo de modelo maxent suportado dentro das seções.
pub const GIS_TYPE: &str = "GIS";

pub const TAGDICT_SECTION: &str = "tagdict";
pub const ABBREVIATIONS_SECTION: &str = "abbreviations";
pub const DICTIONARY_SECTION: &str = "dictionary";

/// Carrega um modelo a partir de bytes em memória.
pub fn load_model(bytes: &[u8]) -> Result<Arc<Model>> {
    let mut cursor = bytes;
    let model = read_model(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(NlpError::corrupt_model(format!(
            "{} bytes após a última seção",
            cursor.len()
        )));
    }
    Ok(model)
}

/// Carrega um modelo de qualquer `Read` (arquivo, socket, ...).
pub fn read_model<R: Read>(mut rdr: R) -> Result<Arc<Model>> {
    let mut magic = [0u8; 4];
    rdr.read_exact(&mut magic).map_err(truncated)?;
    if let Some(format) = compression_format(&magic) {
        return Err(NlpError::unsupported_model_type(format!(
            "contêiner compactado ({format}) não suportado; descompacte o modelo antes de carregar"
        )));
    }
    if &magic != MAGIC {
        return Err(NlpError::corrupt_model(format!("magic inválido: {magic:?}")));
    }
    let version = read_u32(&mut rdr)?;
    if version != FORMAT_VERSION {
        return Err(NlpError::corrupt_model(format!(
            "versão {version} não suportada (esperado {FORMAT_VERSION})"
        )));
    }

    let kind_name = read_str(&mut rdr)?;
    let kind = ModelKind::from_name(&kind_name)
        .ok_or_else(|| NlpError::unsupported_model_type(kind_name.clone()))?;

    let manifest_bytes = read_block(&mut rdr)?;
    let manifest: BTreeMap<String, String> = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| NlpError::corrupt_model(format!("manifest inválido: {e}")))?;

    let mut model = Model::empty(kind);
    for (key, value) in &manifest {
        model = model.with_manifest_entry(key, value);
    }

    let section_count = read_u32(&mut rdr)?;
    let mut seen = BTreeSet::new();
    for _ in 0..section_count {
        let name = read_str(&mut rdr)?;
        let payload = read_block(&mut rdr)?;
        if !seen.insert(name.clone()) {
            return Err(NlpError::corrupt_model(format!("seção '{name}' duplicada")));
        }
        model = match name.as_str() {
            TAGDICT_SECTION => model.with_tag_dictionary(TagDictionary {
                entries: parse_json(&name, &payload)?,
            }),
            ABBREVIATIONS_SECTION => {
                let list: Vec<String> = parse_json(&name, &payload)?;
                model.with_abbreviations(list)
            }
            DICTIONARY_SECTION => model.with_dictionary(EntityDictionary {
                entries: parse_json(&name, &payload)?,
            }),
            _ => {
                let mut cursor = payload.as_slice();
                let maxent = read_gis(&mut cursor)?;
                if !cursor.is_empty() {
                    return Err(NlpError::corrupt_model(format!(
                        "seção '{name}' com {} bytes sobrando",
                        cursor.len()
                    )));
                }
                model.with_section(&name, maxent)
            }
        };
    }
    model.validate()?;

    debug!(
        kind = %model.kind(),
        sections = section_count,
        "modelo carregado"
    );
    Ok(Arc::new(model))
}

/// Serializa um modelo no formato aceito por [`read_model`].
pub fn write_model<W: Write>(model: &Model, mut wtr: W) -> Result<()> {
    wtr.write_all(MAGIC)?;
    write_u32(&mut wtr, FORMAT_VERSION)?;
    write_str(&mut wtr, model.kind().name())?;
    write_block(&mut wtr, &serde_json::to_vec(model.manifest())?)?;

    let mut sections: Vec<(String, Vec<u8>)> = Vec::new();
    for (name, maxent) in model.sections() {
        let mut payload = Vec::new();
        write_gis(maxent, &mut payload)?;
        sections.push((name.to_string(), payload));
    }
    if let Some(dict) = model.tag_dictionary() {
        sections.push((TAGDICT_SECTION.to_string(), serde_json::to_vec(&dict.entries)?));
    }
    if let Some(abbreviations) = model.abbreviations() {
        sections.push((ABBREVIATIONS_SECTION.to_string(), serde_json::to_vec(abbreviations)?));
    }
    if let Some(dict) = model.dictionary() {
        sections.push((DICTIONARY_SECTION.to_string(), serde_json::to_vec(&dict.entries)?));
    }

    write_u32(&mut wtr, len_u32(sections.len())?)?;
    for (name, payload) in &sections {
        write_str(&mut wtr, name)?;
        write_block(&mut wtr, payload)?;
    }
    debug!(kind = %model.kind(), sections = sections.len(), "modelo serializado");
    Ok(())
}

/// Atalho para `write_model` em um buffer novo.
pub fn model_to_bytes(model: &Model) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_model(model, &mut bytes)?;
    Ok(bytes)
}

/// Lê um modelo maxent no layout GIS.
///
/// ```text
/// "GIS" | constante de correção i32 | parâmetro de correção f64
/// outcomes:  i32 + labels
/// padrões:   i32 + strings "n o1 o2 ..." (n predicados compartilham os outcomes o1, o2, ...)
/// predicados: i32 + labels (agrupados na ordem dos padrões)
/// pesos:     f64 por (predicado, outcome do padrão)
/// ```
pub fn read_gis<R: Read>(mut rdr: R) -> Result<MaxentModel> {
    let model_type = read_str(&mut rdr)?;
    if model_type != GIS_TYPE {
        return Err(NlpError::corrupt_model(format!(
            "tipo de modelo maxent '{model_type}' não suportado"
        )));
    }
    let correction_constant = read_i32(&mut rdr)?;
    let correction_param = read_f64(&mut rdr)?;

    let num_outcomes = read_count(&mut rdr, "outcomes")?;
    let mut outcomes = Vec::with_capacity(num_outcomes.min(1024));
    for _ in 0..num_outcomes {
        outcomes.push(read_str(&mut rdr)?);
    }

    let num_patterns = read_count(&mut rdr, "padrões")?;
    let mut patterns: Vec<(usize, Vec<usize>)> = Vec::with_capacity(num_patterns.min(1024));
    for _ in 0..num_patterns {
        patterns.push(parse_pattern(&read_str(&mut rdr)?)?);
    }

    let num_predicates = read_count(&mut rdr, "predicados")?;
    let declared = patterns
        .iter()
        .try_fold(0usize, |total, (count, _)| total.checked_add(*count))
        .ok_or_else(|| NlpError::corrupt_model("contagens dos padrões estouram usize"))?;
    if declared != num_predicates {
        return Err(NlpError::corrupt_model(format!(
            "padrões cobrem {declared} predicados, tabela declara {num_predicates}"
        )));
    }
    let mut predicates = Vec::with_capacity(num_predicates.min(4096));
    for _ in 0..num_predicates {
        predicates.push(read_str(&mut rdr)?);
    }

    let mut params = Vec::with_capacity(num_predicates.min(4096));
    for (count, pattern_outcomes) in &patterns {
        for _ in 0..*count {
            let mut parameters = Vec::with_capacity(pattern_outcomes.len());
            for _ in pattern_outcomes {
                parameters.push(read_f64(&mut rdr)?);
            }
            params.push(Context {
                outcomes: pattern_outcomes.clone(),
                parameters,
            });
        }
    }

    MaxentModel::from_parts(
        outcomes,
        predicates,
        params,
        f64::from(correction_constant),
        correction_param,
    )
}

/// Escreve um modelo maxent no layout GIS.
pub fn write_gis<W: Write>(model: &MaxentModel, mut wtr: W) -> Result<()> {
    write_str(&mut wtr, GIS_TYPE)?;
    write_i32(&mut wtr, model.correction_constant().round() as i32)?;
    write_f64(&mut wtr, model.correction_param())?;

    write_i32(&mut wtr, len_i32(model.num_outcomes())?)?;
    for outcome in model.outcomes() {
        write_str(&mut wtr, outcome)?;
    }

    // agrupa predicados com o mesmo conjunto de outcomes, na ordem de aparição
    let mut groups: Vec<(&[usize], Vec<(&str, &Context)>)> = Vec::new();
    let mut index: HashMap<&[usize], usize> = HashMap::new();
    for (pred, ctx) in model.contexts() {
        let slot = *index.entry(ctx.outcomes.as_slice()).or_insert_with(|| {
            groups.push((ctx.outcomes.as_slice(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((pred, ctx));
    }

    write_i32(&mut wtr, len_i32(groups.len())?)?;
    for (outcomes, members) in &groups {
        let mut pattern = members.len().to_string();
        for o in outcomes.iter() {
            pattern.push(' ');
            pattern.push_str(&o.to_string());
        }
        write_str(&mut wtr, &pattern)?;
    }

    write_i32(&mut wtr, len_i32(model.num_predicates())?)?;
    for (_, members) in &groups {
        for (pred, _) in members {
            write_str(&mut wtr, pred)?;
        }
    }
    for (_, members) in &groups {
        for (_, ctx) in members {
            for &w in &ctx.parameters {
                write_f64(&mut wtr, w)?;
            }
        }
    }
    Ok(())
}

/// Formatos compactados reconhecidos pelo início do stream.
fn compression_format(magic: &[u8; 4]) -> Option<&'static str> {
    match magic {
        [0x1f, 0x8b, ..] => Some("gzip"),
        [b'P', b'K', 0x03, 0x04] => Some("zip"),
        [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] => Some("zlib"),
        _ => None,
    }
}

fn parse_pattern(pattern: &str) -> Result<(usize, Vec<usize>)> {
    let mut fields = pattern.split_whitespace().map(|f| {
        f.parse::<usize>()
            .map_err(|_| NlpError::corrupt_model(format!("padrão inválido: '{pattern}'")))
    });
    let count = fields
        .next()
        .ok_or_else(|| NlpError::corrupt_model("padrão vazio"))??;
    let outcomes = fields.collect::<Result<Vec<_>>>()?;
    Ok((count, outcomes))
}

fn parse_json<T: serde::de::DeserializeOwned>(section: &str, payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload)
        .map_err(|e| NlpError::corrupt_model(format!("seção '{section}' inválida: {e}")))
}

fn truncated(err: io::Error) -> NlpError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        NlpError::corrupt_model("stream truncado")
    } else {
        NlpError::Io(err)
    }
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| NlpError::invalid_input(format!("tamanho {len} excede u32")))
}

fn len_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| NlpError::invalid_input(format!("tamanho {len} excede i32")))
}

fn read_u16<R: Read>(mut rdr: R) -> Result<u16> {
    let mut buf = [0; 2];
    rdr.read_exact(&mut buf).map_err(truncated)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(mut rdr: R) -> Result<u32> {
    let mut buf = [0; 4];
    rdr.read_exact(&mut buf).map_err(truncated)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32<R: Read>(mut rdr: R) -> Result<i32> {
    let mut buf = [0; 4];
    rdr.read_exact(&mut buf).map_err(truncated)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_f64<R: Read>(mut rdr: R) -> Result<f64> {
    let mut buf = [0; 8];
    rdr.read_exact(&mut buf).map_err(truncated)?;
    Ok(f64::from_be_bytes(buf))
}

fn read_count<R: Read>(rdr: R, what: &str) -> Result<usize> {
    let count = read_i32(rdr)?;
    usize::try_from(count)
        .map_err(|_| NlpError::corrupt_model(format!("contagem negativa de {what}: {count}")))
}

/// Lê exatamente `len` bytes sem confiar no tamanho declarado para alocar.
fn read_exact_vec<R: Read>(rdr: R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rdr.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(NlpError::corrupt_model("stream truncado"));
    }
    Ok(buf)
}

fn read_str<R: Read>(mut rdr: R) -> Result<String> {
    let len = read_u16(&mut rdr)?;
    let bytes = read_exact_vec(rdr, usize::from(len))?;
    String::from_utf8(bytes).map_err(|_| NlpError::corrupt_model("string com UTF-8 inválido"))
}

fn read_block<R: Read>(mut rdr: R) -> Result<Vec<u8>> {
    let len = read_u32(&mut rdr)?;
    read_exact_vec(rdr, len as usize)
}

fn write_u32<W: Write>(mut wtr: W, value: u32) -> Result<()> {
    wtr.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_i32<W: Write>(mut wtr: W, value: i32) -> Result<()> {
    wtr.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(mut wtr: W, value: f64) -> Result<()> {
    wtr.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn write_str<W: Write>(mut wtr: W, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| NlpError::invalid_input(format!("string de {} bytes excede u16", value.len())))?;
    wtr.write_all(&len.to_be_bytes())?;
    wtr.write_all(value.as_bytes())?;
    Ok(())
}

fn write_block<W: Write>(mut wtr: W, bytes: &[u8]) -> Result<()> {
    write_u32(&mut wtr, len_u32(bytes.len())?)?;
    wtr.write_all(bytes)?;
    Ok(())
}
