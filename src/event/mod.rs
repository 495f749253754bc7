/// 盤中下跌警示
pub mod dip;
