//! 完成记录的后台写入
//!
//! 练习完成后只把记录投递到队列，由后台线程写入存储；写入结果通过
//! `TypingEvent::SessionSaved` / `TypingEvent::SaveFailed` 通知调用方（如果提供了事件通道）。

use anyhow::Result;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use typemaster_core::{NewSessionRecord, PersistTicket, TypingEvent};

#[cfg(feature = "persistence")]
use typemaster_persistence::Database;

/// 练习记录的写入目标
pub trait SessionSink: Send + 'static {
    fn record(&mut self, record: &NewSessionRecord) -> Result<i64>;
}

#[cfg(feature = "persistence")]
impl SessionSink for Database {
    fn record(&mut self, record: &NewSessionRecord) -> Result<i64> {
        Ok(self.insert_session(record)?)
    }
}

enum Job {
    Write {
        ticket: PersistTicket,
        record: NewSessionRecord,
        reply: Option<mpsc::Sender<TypingEvent>>,
    },
    Shutdown,
}

/// 拥有后台写入线程
pub struct SessionRecorder {
    handle: RecorderHandle,
    worker: Option<JoinHandle<()>>,
}

/// 可克隆的投递端
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Job>,
    next_ticket: Arc<AtomicU64>,
}

impl SessionRecorder {
    pub fn spawn<S: SessionSink>(mut sink: S) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();

        let worker = std::thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                match job {
                    Job::Write {
                        ticket,
                        record,
                        reply,
                    } => {
                        let event = match sink.record(&record) {
                            Ok(record_id) => {
                                debug!("💾 记录已保存 #{} ({:?})", record_id, ticket);
                                TypingEvent::SessionSaved { ticket, record_id }
                            }
                            Err(e) => {
                                warn!("保存练习记录失败 ({:?}): {:#}", ticket, e);
                                TypingEvent::SaveFailed {
                                    ticket,
                                    reason: e.to_string(),
                                }
                            }
                        };
                        if let Some(reply) = reply {
                            let _ = reply.send(event);
                        }
                    }
                    Job::Shutdown => break,
                }
            }
        });

        Self {
            handle: RecorderHandle {
                tx,
                next_ticket: Arc::new(AtomicU64::new(1)),
            },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    /// 处理完已排队的写入后结束后台线程
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.tx.send(Job::Shutdown);
            if worker.join().is_err() {
                warn!("记录线程异常退出");
            }
        }
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

impl RecorderHandle {
    /// 投递一条记录，立即返回任务编号
    pub fn submit(
        &self,
        record: NewSessionRecord,
        reply: Option<mpsc::Sender<TypingEvent>>,
    ) -> PersistTicket {
        let ticket = PersistTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed));

        let job = Job::Write {
            ticket,
            record,
            reply,
        };
        if let Err(mpsc::SendError(job)) = self.tx.send(job) {
            warn!("记录线程已停止，丢弃 {:?}", ticket);
            if let Job::Write {
                reply: Some(reply), ..
            } = job
            {
                let _ = reply.send(TypingEvent::SaveFailed {
                    ticket,
                    reason: "recorder stopped".to_string(),
                });
            }
        }

        ticket
    }
}
