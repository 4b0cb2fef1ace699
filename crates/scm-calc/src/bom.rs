//! BOM 展開：變體排程 → 零件每日毛需求

use chrono::NaiveDate;
use scm_core::{DailyRequirement, Result, ScmError, SimConfig, VariantPlan};
use std::collections::BTreeMap;

/// 零件的一個使用者（變體與單位用量）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub variant_id: String,
    pub quantity_per_unit: u32,
}

/// BOM 解析器
#[derive(Debug, Clone)]
pub struct BomResolver {
    /// 零件 → 使用它的變體
    consumers: BTreeMap<String, Vec<Consumer>>,
    /// 變體 → 零件與用量
    components: BTreeMap<String, Vec<(String, u32)>>,
}

impl BomResolver {
    /// 由配置建立；每個變體至少要有一個零件
    pub fn new(config: &SimConfig) -> Result<Self> {
        let mut consumers: BTreeMap<String, Vec<Consumer>> = config
            .components
            .iter()
            .map(|c| (c.id.clone(), Vec::new()))
            .collect();
        let mut components: BTreeMap<String, Vec<(String, u32)>> = BTreeMap::new();

        for position in &config.bom {
            if config.variant(&position.variant_id).is_none() {
                return Err(ScmError::UnknownVariant(position.variant_id.clone()));
            }
            if position.quantity_per_unit == 0 {
                return Err(ScmError::InvalidBomQuantity {
                    variant_id: position.variant_id.clone(),
                    component_id: position.component_id.clone(),
                });
            }
            let entry = consumers
                .get_mut(&position.component_id)
                .ok_or_else(|| ScmError::UnknownComponent(position.component_id.clone()))?;
            entry.push(Consumer {
                variant_id: position.variant_id.clone(),
                quantity_per_unit: position.quantity_per_unit,
            });
            components
                .entry(position.variant_id.clone())
                .or_default()
                .push((position.component_id.clone(), position.quantity_per_unit));
        }

        for variant in &config.variants {
            if !components.contains_key(&variant.id) {
                return Err(ScmError::MissingBomMapping {
                    variant_id: variant.id.clone(),
                });
            }
        }

        for list in consumers.values_mut() {
            list.sort_by(|a, b| a.variant_id.cmp(&b.variant_id));
        }

        Ok(Self {
            consumers,
            components,
        })
    }

    pub fn component_ids(&self) -> impl Iterator<Item = &String> {
        self.consumers.keys()
    }

    /// 使用某零件的變體（依變體 ID 排序）
    pub fn consumers(&self, component_id: &str) -> &[Consumer] {
        self.consumers
            .get(component_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn components_of(&self, variant_id: &str) -> &[(String, u32)] {
        self.components
            .get(variant_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 單日毛需求 = Σ 變體排程量 × 用量
    pub fn requirement_on(
        &self,
        component_id: &str,
        date: NaiveDate,
        programs: &BTreeMap<String, VariantPlan>,
    ) -> Result<u32> {
        let total: u64 = self
            .consumers(component_id)
            .iter()
            .map(|c| {
                let scheduled = programs
                    .get(&c.variant_id)
                    .map(|p| p.scheduled_on(date))
                    .unwrap_or(0);
                scheduled as u64 * c.quantity_per_unit as u64
            })
            .sum();
        u32::try_from(total).map_err(|_| {
            ScmError::CalculationError(format!(
                "物料 {} 於 {} 的毛需求溢出: {}",
                component_id, date, total
            ))
        })
    }

    /// 全部零件的每日毛需求序列
    pub fn component_requirements(
        &self,
        programs: &BTreeMap<String, VariantPlan>,
        dates: &[NaiveDate],
    ) -> Result<BTreeMap<String, Vec<DailyRequirement>>> {
        self.consumers
            .keys()
            .map(|component_id| {
                let series = dates
                    .iter()
                    .map(|&date| {
                        Ok(DailyRequirement::new(
                            date,
                            self.requirement_on(component_id, date, programs)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((component_id.clone(), series))
            })
            .collect()
    }
}
