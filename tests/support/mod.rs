#![allow(dead_code)]

use std::path::{Path, PathBuf};

use census_report::model::{
    AggregatedRow, ColumnSums, DenominatorPolicy, DictionaryEntry, NarrativeParagraph, Report,
};
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet};

pub const POPULATION: &str = "2. Variables de Población (Personas)";
pub const HOUSING: &str = "4. Viviendas y Hogares";
pub const GEOGRAPHY: &str = "1. Identificación Geográfica";

pub fn entry(topic: &str, subtopic: &str, column: &str, label: &str) -> DictionaryEntry {
    DictionaryEntry {
        topic: topic.to_string(),
        subtopic: subtopic.to_string(),
        column: column.to_string(),
        label: label.to_string(),
        detail: String::new(),
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn sums(pairs: &[(&str, f64)]) -> ColumnSums {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn member(label: &str, value: f64, percentage: Option<f64>) -> AggregatedRow {
    AggregatedRow {
        label: label.to_string(),
        column: Some(format!("n_{}", label.to_lowercase().replace(' ', "_"))),
        raw_value: value,
        value,
        percentage,
        is_total: false,
        is_subtotal: false,
        category: None,
    }
}

pub fn simple_report(title: &str, rows: Vec<AggregatedRow>) -> Report {
    Report {
        title: title.to_string(),
        unit: None,
        rows,
        category_column: None,
        denominator: DenominatorPolicy::SumOfMembers,
        narratives: vec![NarrativeParagraph {
            heading: None,
            text: format!("{title}: texto de prueba."),
        }],
    }
}

/// Census-shaped dictionary covering sex, age, basic services and a
/// geographic identifier.
pub const DICTIONARY_CSV: &str = "\
Tema,Subtema,Variable_Codigo,Descripcion_Etiqueta,Valores_Codigos_y_Detalle
1. Identificación Geográfica,Código,n_region,Región,
2. Variables de Población (Personas),General,n_per,Población total,
2. Variables de Población (Personas),Sexo,n_hombres,Hombres,
2. Variables de Población (Personas),Sexo,n_mujeres,Mujeres,
2. Variables de Población (Personas),Edad,n_edad_0_14,0 a 14 años,
2. Variables de Población (Personas),Edad,n_edad_15_64,15 a 64 años,
4. Viviendas y Hogares,Servicios Básicos,n_fuente_agua_red,Fuente de agua: Red pública,
4. Viviendas y Hogares,Servicios Básicos,n_fuente_agua_pozo,Fuente de agua: Pozo,
4. Viviendas y Hogares,Servicios Básicos,n_serv_hig_alc,Servicio higiénico: Alcantarillado,
";

pub const DATASET_CSV: &str = "\
ID_ENTIDAD,ENTIDAD,COMUNA,n_region,n_per,n_hombres,n_mujeres,n_edad_0_14,n_edad_15_64,n_fuente_agua_red,n_fuente_agua_pozo,n_serv_hig_alc,n_extra
1,Centro,Talca,7,60,28,32,20,40,6,18,3,1
2,Norte,Talca,7,40,12,28,10,30,4,12,2,2
";

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }
}

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}
