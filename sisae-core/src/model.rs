/*!
Sanction and user records.

Field names serialize in camelCase so that backup files stay compatible with
the documents produced by the web dashboard.
*/

use crate::{Result, SisaeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The sequence-numbered collections
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Sanctions against clubs
    Club,
    /// Sanctions against individuals
    Personal,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Club => "club",
            Collection::Personal => "personal",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sanction issued against a club
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClubSanction {
    pub id: String,
    /// Human-facing record number, unique within the club collection
    pub numero_carga: u32,
    pub nombre_sancionado: String,
    pub deporte: String,
    pub ubicacion: String,
    pub tipo_sancion: String,
    /// Sanction reason tags (one or more)
    pub motivo_sancion: Vec<String>,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub acta_pdf: Option<String>,
    #[serde(default)]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

/// Writable shape of a club sanction
///
/// Everything the operator enters; the id, record number and creation
/// timestamp are assigned by the repository.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewClubSanction {
    pub nombre_sancionado: String,
    pub deporte: String,
    pub ubicacion: String,
    pub tipo_sancion: String,
    #[serde(default)]
    pub motivo_sancion: Vec<String>,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub acta_pdf: Option<String>,
}

impl NewClubSanction {
    /// Check the rules the entry form enforces
    pub fn validate(&self) -> Result<()> {
        if self.motivo_sancion.is_empty() {
            return Err(SisaeError::validation(
                "at least one sanction reason is required",
            ));
        }
        if self.nombre_sancionado.trim().is_empty() {
            return Err(SisaeError::validation("nombreSancionado cannot be empty"));
        }
        Ok(())
    }
}

impl From<&ClubSanction> for NewClubSanction {
    fn from(s: &ClubSanction) -> Self {
        Self {
            nombre_sancionado: s.nombre_sancionado.clone(),
            deporte: s.deporte.clone(),
            ubicacion: s.ubicacion.clone(),
            tipo_sancion: s.tipo_sancion.clone(),
            motivo_sancion: s.motivo_sancion.clone(),
            fecha_inicio: s.fecha_inicio.clone(),
            fecha_fin: s.fecha_fin.clone(),
            observaciones: s.observaciones.clone(),
            acta_pdf: s.acta_pdf.clone(),
        }
    }
}

/// A sanction issued against an individual
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalSanction {
    pub id: String,
    pub numero_carga: u32,
    pub nombre_persona: String,
    pub dni_persona: String,
    pub edad_persona: u32,
    pub deporte: String,
    pub ubicacion: String,
    pub motivo_sancion: String,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub acta_pdf: Option<String>,
    /// Already included in a compliance report
    #[serde(default)]
    pub reportada_en_pdf: bool,
    #[serde(default)]
    pub fecha_creacion: Option<DateTime<Utc>>,
}

/// Writable shape of a personal sanction
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonalSanction {
    pub nombre_persona: String,
    pub dni_persona: String,
    pub edad_persona: u32,
    pub deporte: String,
    pub ubicacion: String,
    pub motivo_sancion: String,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub acta_pdf: Option<String>,
}

impl NewPersonalSanction {
    pub fn validate(&self) -> Result<()> {
        if self.nombre_persona.trim().is_empty() {
            return Err(SisaeError::validation("nombrePersona cannot be empty"));
        }
        if self.dni_persona.trim().is_empty() {
            return Err(SisaeError::validation("dniPersona cannot be empty"));
        }
        Ok(())
    }
}

impl From<&PersonalSanction> for NewPersonalSanction {
    fn from(s: &PersonalSanction) -> Self {
        Self {
            nombre_persona: s.nombre_persona.clone(),
            dni_persona: s.dni_persona.clone(),
            edad_persona: s.edad_persona,
            deporte: s.deporte.clone(),
            ubicacion: s.ubicacion.clone(),
            motivo_sancion: s.motivo_sancion.clone(),
            fecha_inicio: s.fecha_inicio.clone(),
            fecha_fin: s.fecha_fin.clone(),
            observaciones: s.observaciones.clone(),
            acta_pdf: s.acta_pdf.clone(),
        }
    }
}

/// Dashboard account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    /// `admin` or `user`
    pub role: String,
    pub is_active: bool,
    pub temporary_access: bool,
    #[serde(default)]
    pub access_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}
