use serde::Deserialize;

use crate::domain::sim_model::task::task::TaskDescriptor;
use crate::domain::sim_model::utils::id::{TaskId, TaskName};

/// One row of a task dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRecordDto {
    pub task_name: String,
    pub generation_time: f64,
    #[serde(rename = "TaskID")]
    pub task_id: u64,
    pub task_size: f64,
    pub cycles_per_bit: f64,
    pub trans_bit_rate: f64,
    #[serde(rename = "DDL")]
    pub ddl: f64,
    pub src_name: String,
    pub dst_name: String,
}

impl From<&TaskRecordDto> for TaskDescriptor {
    fn from(dto: &TaskRecordDto) -> Self {
        TaskDescriptor {
            id: TaskId(dto.task_id),
            name: TaskName::new(dto.task_name.clone()),
            size: dto.task_size,
            cycles_per_bit: dto.cycles_per_bit,
            trans_bit_rate: dto.trans_bit_rate,
            ddl: dto.ddl,
        }
    }
}
