//! In-process repository adapter.

use super::SanctionRepository;
use crate::model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction, User,
};
use crate::{Result, SisaeError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// The complete live data set
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    #[serde(default)]
    pub club_sanctions: Vec<ClubSanction>,
    #[serde(default)]
    pub personal_sanctions: Vec<PersonalSanction>,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Repository that keeps the data set in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    data: RwLock<DataSet>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: DataSet) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Copy of the current data set
    pub fn data(&self) -> Result<DataSet> {
        Ok(self.read()?.clone())
    }

    /// Add a user account
    pub fn add_user(&self, user: User) -> Result<()> {
        self.write()?.users.push(user);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DataSet>> {
        self.data
            .read()
            .map_err(|_| SisaeError::repository("data set lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DataSet>> {
        self.data
            .write()
            .map_err(|_| SisaeError::repository("data set lock poisoned"))
    }

    /// Swap in a complete data set
    pub(crate) fn replace(&self, data: DataSet) -> Result<()> {
        *self.write()? = data;
        Ok(())
    }
}

impl DataSet {
    pub(crate) fn insert_club(&mut self, s: NewClubSanction, numero_carga: u32) -> ClubSanction {
        let record = ClubSanction {
            id: Uuid::new_v4().to_string(),
            numero_carga,
            nombre_sancionado: s.nombre_sancionado,
            deporte: s.deporte,
            ubicacion: s.ubicacion,
            tipo_sancion: s.tipo_sancion,
            motivo_sancion: s.motivo_sancion,
            fecha_inicio: s.fecha_inicio,
            fecha_fin: s.fecha_fin,
            observaciones: s.observaciones,
            acta_pdf: s.acta_pdf,
            fecha_creacion: Some(Utc::now()),
        };
        self.club_sanctions.push(record.clone());
        record
    }

    pub(crate) fn insert_personal(
        &mut self,
        s: NewPersonalSanction,
        numero_carga: u32,
    ) -> PersonalSanction {
        let record = PersonalSanction {
            id: Uuid::new_v4().to_string(),
            numero_carga,
            nombre_persona: s.nombre_persona,
            dni_persona: s.dni_persona,
            edad_persona: s.edad_persona,
            deporte: s.deporte,
            ubicacion: s.ubicacion,
            motivo_sancion: s.motivo_sancion,
            fecha_inicio: s.fecha_inicio,
            fecha_fin: s.fecha_fin,
            observaciones: s.observaciones,
            acta_pdf: s.acta_pdf,
            reportada_en_pdf: false,
            fecha_creacion: Some(Utc::now()),
        };
        self.personal_sanctions.push(record.clone());
        record
    }

    pub(crate) fn mark_reported(&mut self, ids: &[String]) {
        for sanction in self
            .personal_sanctions
            .iter_mut()
            .filter(|s| ids.contains(&s.id))
        {
            sanction.reportada_en_pdf = true;
        }
    }

    pub(crate) fn clear_sanctions(&mut self) {
        self.club_sanctions.clear();
        self.personal_sanctions.clear();
    }
}

#[async_trait]
impl SanctionRepository for MemoryRepository {
    async fn club_sanctions(&self) -> Result<Vec<ClubSanction>> {
        let mut list = self.read()?.club_sanctions.clone();
        list.sort_by(|a, b| b.numero_carga.cmp(&a.numero_carga));
        Ok(list)
    }

    async fn personal_sanctions(&self) -> Result<Vec<PersonalSanction>> {
        let mut list = self.read()?.personal_sanctions.clone();
        list.sort_by(|a, b| b.numero_carga.cmp(&a.numero_carga));
        Ok(list)
    }

    async fn users(&self) -> Result<Vec<User>> {
        let mut list = self.read()?.users.clone();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn max_sequence(&self, collection: Collection) -> Result<Option<u32>> {
        let data = self.read()?;
        Ok(match collection {
            Collection::Club => data.club_sanctions.iter().map(|s| s.numero_carga).max(),
            Collection::Personal => data.personal_sanctions.iter().map(|s| s.numero_carga).max(),
        })
    }

    async fn insert_club_sanction(
        &self,
        sanction: NewClubSanction,
        numero_carga: u32,
    ) -> Result<ClubSanction> {
        Ok(self.write()?.insert_club(sanction, numero_carga))
    }

    async fn insert_personal_sanction(
        &self,
        sanction: NewPersonalSanction,
        numero_carga: u32,
    ) -> Result<PersonalSanction> {
        Ok(self.write()?.insert_personal(sanction, numero_carga))
    }

    async fn mark_personal_sanctions_reported(&self, ids: Vec<String>) -> Result<()> {
        self.write()?.mark_reported(&ids);
        Ok(())
    }

    async fn clear_sanctions(&self) -> Result<()> {
        self.write()?.clear_sanctions();
        Ok(())
    }
}
