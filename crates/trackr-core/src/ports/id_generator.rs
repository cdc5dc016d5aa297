//! IdGenerator port - レポート ID の採番
//!
//! ID は ULID 文字列。先頭 48 bit が作成時刻なので、同じプロジェクトの
//! レポートは ID の辞書順でもおおむね作成順に並ぶ。

use crate::domain::ids::ReportId;
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_report_id(&self) -> ReportId;
}

/// Clock の時刻で timestamp 部分を埋める ULID 生成器
///
/// FixedClock を渡せば timestamp が固定される（ランダム部分は毎回変わる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_report_id(&self) -> ReportId {
        // 1970 年より前の時計は 0 に寄せる
        let millis = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        ReportId::from(Ulid::from_parts(millis, rand::random()))
    }
}
