use clap::{Arg, ArgMatches, Command};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use word_chain::*;

fn cli() -> Command<'static> {
    let room_arg = || Arg::new("room").help("房间号").required(true).index(1);

    Command::new("wordchain")
        .version("0.1")
        .about("单词接龙房间工具")
        .subcommand_required(true)
        .subcommand(
            Command::new("start")
                .about("写入玩家名单并开局，第一位玩家为房主且先手")
                .arg(room_arg())
                .arg(
                    Arg::new("player")
                        .help("玩家，格式为 id:昵称")
                        .long("player")
                        .short('p')
                        .takes_value(true)
                        .multiple_occurrences(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("submit")
                .about("提交一个单词")
                .arg(room_arg())
                .arg(Arg::new("player").help("玩家ID").required(true).index(2))
                .arg(Arg::new("word").help("单词").required(true).index(3))
                .arg(
                    Arg::new("json")
                        .help("以 JSON 输出结果")
                        .long("json")
                        .takes_value(false),
                ),
        )
        .subcommand(Command::new("show").about("显示当前接龙").arg(room_arg()))
        .subcommand(Command::new("outcome").about("显示本局结果").arg(room_arg()))
        .subcommand(Command::new("watch").about("持续显示房间变化").arg(room_arg()))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.value_of(name)
        .ok_or_else(|| Error::Config(format!("缺少参数 {}", name)))
}

/// 解析 id:昵称，第一位玩家是房主
fn parse_players(args: &ArgMatches) -> Result<Vec<Player>> {
    let specs = args
        .values_of("player")
        .ok_or_else(|| Error::Config("缺少玩家".to_string()))?;

    specs
        .enumerate()
        .map(|(i, spec)| {
            let (id, name) = spec
                .split_once(':')
                .ok_or_else(|| Error::Config(format!("玩家格式应为 id:昵称，收到 {}", spec)))?;
            if id.is_empty() {
                return Err(Error::Config(format!("玩家ID不能为空: {}", spec)));
            }
            Ok(if i == 0 {
                Player::host(id, name)
            } else {
                Player::new(id, name)
            })
        })
        .collect()
}

fn print_state(state: &ChainState, players: &[Player]) {
    let name_of = |id: &str| {
        players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    println!("状态: {}", state.phase());
    println!("接龙: {}", state.chain.join(" -> "));
    if !state.game_over {
        println!("轮到: {}", name_of(&state.current_player_id));
    }
    println!("得分:");
    for player in players {
        println!("  {}: {}", player.display_name, state.score_of(&player.id));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    Config::init()?;
    let config = Config::get();

    // 日志写到 stderr，stdout 留给命令输出
    tracing_subscriber::registry()
        .with(EnvFilter::new(config.log_filter()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("配置加载成功: {:?}", config);

    let store = Arc::new(RedisStore::new(&config.store).await?);

    match matches.subcommand() {
        Some(("start", args)) => {
            let room = Room::new(required(args, "room")?, store);
            let players = parse_players(args)?;
            let state = room.start_round(&players, &config.room).await?;
            println!("房间 {} 已开局", room.code());
            print_state(&state, &players);
        }
        Some(("submit", args)) => {
            let room = Room::new(required(args, "room")?, store);
            let mv = Move::new(required(args, "player")?, required(args, "word")?);
            let report = room.submit(&mv).await?;

            if args.is_present("json") {
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| Error::Internal(e.into()))?;
                println!("{}", json);
            } else {
                match &report {
                    TurnReport::Accepted {
                        word,
                        score,
                        game_over,
                        ..
                    } => {
                        println!(
                            "{}: 单词长度 {} + 链长 {} + 成环奖励 {} = {}",
                            word,
                            score.word_length_points,
                            score.chain_length_points,
                            score.circle_bonus,
                            score.total
                        );
                        if *game_over {
                            let outcome = room.outcome().await?;
                            println!("游戏结束！{}", outcome.announce(&room.players().await?));
                        }
                    }
                    TurnReport::Rejected { message, .. } => println!("未接受: {}", message),
                }
            }
        }
        Some(("show", args)) => {
            let room = Room::new(required(args, "room")?, store);
            let state = room.snapshot().await?;
            print_state(&state, &room.players().await?);
        }
        Some(("outcome", args)) => {
            let room = Room::new(required(args, "room")?, store);
            let players = room.players().await?;
            let outcome = room.outcome().await?;
            println!("{}", outcome.announce(&players));
        }
        Some(("watch", args)) => {
            let room = Room::new(required(args, "room")?, store);
            let players = room.players().await?;
            let mut updates = room.watch().await?;
            while let Some(state) = updates.recv().await {
                print_state(&state, &players);
                println!();
            }
        }
        _ => {
            println!("请使用 --help 查看可用命令");
        }
    }

    Ok(())
}
